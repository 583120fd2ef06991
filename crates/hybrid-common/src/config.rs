//! Session configuration.
//!
//! Loaded from a camelCase JSON file. Every field has a default that targets
//! the Go toolchain, so an empty object is a valid configuration:
//!
//! ```json
//! {
//!   "query": { "program": "go", "args": ["list", "-deps", "-test", "-json"] },
//!   "rebuild": { "program": "go", "args": ["install"] },
//!   "env": { "GOFLAGS": "-mod=mod" },
//!   "specialPaths": ["unsafe"],
//!   "executableName": "main"
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// An external command: program plus fixed leading arguments. The import
/// path being queried or rebuilt is appended as the final argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
        }
    }

    /// Render the full command line for `target`, for error messages and logs.
    pub fn command_line(&self, target: &str) -> String {
        let mut line = self.program.clone();
        for arg in self.args.iter().map(String::as_str).chain([target]) {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionConfig {
    /// Metadata query enumerating the transitive dependency closure,
    /// including test-only dependencies, as a stream of JSON records.
    pub query: CommandSpec,
    /// Out-of-band rebuild command for stale dependencies.
    pub rebuild: CommandSpec,
    /// Extra environment for both commands.
    pub env: BTreeMap<String, String>,
    /// Import paths of built-in packages that have no artifact and no source.
    pub special_paths: Vec<String>,
    /// Package name that marks an executable (never imported) package.
    pub executable_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            query: CommandSpec::new("go", &["list", "-deps", "-test", "-json"]),
            rebuild: CommandSpec::new("go", &["install"]),
            env: BTreeMap::new(),
            special_paths: vec!["unsafe".to_string()],
            executable_name: "main".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid session configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[cfg(test)]
#[path = "../tests/config_tests.rs"]
mod config_tests;
