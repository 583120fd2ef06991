//! The external metadata query.
//!
//! A session runs exactly one query, scoped to the transitive dependency
//! closure of the target including test-only dependencies. The query's raw
//! output is handed to [`parse_records`](crate::parse_records) as one batch.

use hybrid_common::{CommandSpec, ImportPath, SessionConfig, SessionError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Produces the raw record stream for a target's dependency closure.
pub trait MetadataQuery: Send + Sync {
    /// Human-readable description of what `run` will do, for logs.
    fn describe(&self, target: &ImportPath) -> String;

    fn run(&self, target: &ImportPath, dir: &Path) -> Result<Vec<u8>, SessionError>;
}

/// Runs the query as a child process in the working directory.
#[derive(Debug, Clone)]
pub struct ListCommand {
    spec: CommandSpec,
    env: BTreeMap<String, String>,
}

impl ListCommand {
    pub fn new(spec: CommandSpec, env: BTreeMap<String, String>) -> Self {
        Self { spec, env }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.query.clone(), config.env.clone())
    }
}

impl MetadataQuery for ListCommand {
    fn describe(&self, target: &ImportPath) -> String {
        self.spec.command_line(target.as_str())
    }

    fn run(&self, target: &ImportPath, dir: &Path) -> Result<Vec<u8>, SessionError> {
        let failed = |reason: String, output: String| SessionError::QueryFailed {
            command: self.describe(target),
            target: target.clone(),
            dir: dir.to_path_buf(),
            reason,
            output,
        };

        debug!(command = %self.describe(target), dir = %dir.display(), "running metadata query");
        let output = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .arg(target.as_str())
            .current_dir(dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| failed(format!("failed to start: {err}"), String::new()))?;

        if !output.status.success() {
            return Err(failed(output.status.to_string(), combined_output(&output)));
        }

        if !output.stderr.is_empty() {
            debug!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "metadata query wrote diagnostics"
            );
        }

        Ok(output.stdout)
    }
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !text.is_empty() && !output.stderr.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Replays a previously captured record stream.
///
/// Ignores the target and directory: the stream already describes one
/// specific closure.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    bytes: Vec<u8>,
    source: Option<PathBuf>,
}

impl RecordedQuery {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            source: None,
        }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            bytes: std::fs::read(path)?,
            source: Some(path.to_path_buf()),
        })
    }
}

impl MetadataQuery for RecordedQuery {
    fn describe(&self, _target: &ImportPath) -> String {
        match &self.source {
            Some(path) => format!("recorded metadata from {}", path.display()),
            None => "recorded metadata".to_string(),
        }
    }

    fn run(&self, _target: &ImportPath, _dir: &Path) -> Result<Vec<u8>, SessionError> {
        Ok(self.bytes.clone())
    }
}

#[cfg(test)]
#[path = "../tests/query_tests.rs"]
mod query_tests;
