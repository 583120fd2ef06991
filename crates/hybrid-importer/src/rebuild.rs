//! Out-of-band rebuilds of stale dependencies.
//!
//! A rebuilt artifact cannot help the session that noticed it was stale (that
//! session has already chosen source fallback for the path), but it lets the
//! next session take the binary path. Rebuilds are therefore fire-and-forget:
//! one detached thread per stale path, no join, no retry, no timeout, and the
//! outcome is only logged. If the host process exits first, an in-flight
//! rebuild may be abandoned.

use anyhow::{Context, Result};
use hybrid_catalog::DependencyRecord;
use hybrid_common::{CommandSpec, ImportPath, SessionConfig};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Launches a rebuild of one package. Runs on a detached thread, so it may
/// block for as long as the rebuild takes.
pub trait Rebuilder: Send + Sync {
    fn rebuild(&self, import_path: &ImportPath, dir: &Path) -> Result<()>;
}

/// Runs the configured rebuild command with the import path appended.
#[derive(Debug, Clone)]
pub struct RebuildCommand {
    spec: CommandSpec,
    env: BTreeMap<String, String>,
}

impl RebuildCommand {
    pub fn new(spec: CommandSpec, env: BTreeMap<String, String>) -> Self {
        Self { spec, env }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.rebuild.clone(), config.env.clone())
    }
}

impl Rebuilder for RebuildCommand {
    fn rebuild(&self, import_path: &ImportPath, dir: &Path) -> Result<()> {
        let command_line = self.spec.command_line(import_path.as_str());
        let status = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .arg(import_path.as_str())
            .current_dir(dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to start `{command_line}`"))?;
        if !status.success() {
            anyhow::bail!("`{command_line}` exited with {status}");
        }
        Ok(())
    }
}

/// Fires one detached rebuild per stale dependency.
#[derive(Clone)]
pub struct RebuildTrigger {
    rebuilder: Arc<dyn Rebuilder>,
}

impl RebuildTrigger {
    pub fn new(rebuilder: Arc<dyn Rebuilder>) -> Self {
        Self { rebuilder }
    }

    /// Launch rebuilds for the records that need one and return how many
    /// were launched. Never waits for any of them.
    pub fn fire<'a>(
        &self,
        records: impl IntoIterator<Item = &'a DependencyRecord>,
        dir: &Path,
    ) -> usize {
        let mut launched = 0;
        for record in records.into_iter().filter(|record| record.needs_rebuild()) {
            let rebuilder = Arc::clone(&self.rebuilder);
            let import_path = record.import_path.clone();
            let dir = dir.to_path_buf();
            let spawned = thread::Builder::new()
                .name(format!("rebuild {import_path}"))
                .spawn(move || match rebuilder.rebuild(&import_path, &dir) {
                    Ok(()) => debug!(import_path = %import_path, "rebuild finished"),
                    Err(err) => debug!(import_path = %import_path, error = %format!("{err:#}"), "rebuild failed"),
                });
            match spawned {
                // Dropping the handle detaches the thread.
                Ok(_) => launched += 1,
                Err(err) => {
                    warn!(import_path = %record.import_path, error = %err, "could not launch rebuild");
                }
            }
        }
        launched
    }
}

#[cfg(test)]
#[path = "../tests/rebuild_tests.rs"]
mod rebuild_tests;
