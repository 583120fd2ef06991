//! Error taxonomy.
//!
//! Construction of a session can fail in three ways, all fatal:
//! - the metadata query failed or produced an unparsable stream (`Query`)
//! - an artifact is missing or could not be opened (`ArtifactIo`)
//! - the export-data decoder rejected an artifact (`Decode`)
//!
//! Once a session exists, the only error a consumer sees is
//! [`ResolveError`], scoped to the single import being resolved.

use crate::{DependencyKind, ImportPath};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of every error this workspace produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Query,
    ArtifactIo,
    Decode,
    Resolution,
}

/// A fatal error while constructing a resolution session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The metadata query process could not be started or exited unsuccessfully.
    #[error("failed to run `{command}` for {target} in {}: {reason}\n{output}", dir.display())]
    QueryFailed {
        command: String,
        target: ImportPath,
        dir: PathBuf,
        reason: String,
        /// Everything the process wrote to stdout and stderr.
        output: String,
    },

    /// The metadata stream contained a malformed or truncated record.
    #[error("failed to parse metadata for {target} in {}: {reason}", dir.display())]
    MalformedMetadata {
        target: ImportPath,
        dir: PathBuf,
        reason: String,
    },

    /// A binary-usable dependency's artifact could not be opened.
    #[error("failed to open {} for {import_path}: {source}", path.display())]
    ArtifactIo {
        import_path: ImportPath,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A binary-usable dependency came with no artifact location.
    #[error("no artifact location reported for {import_path}")]
    MissingArtifact { import_path: ImportPath },

    /// The export-data decoder rejected an artifact.
    #[error("failed to decode {format} export data for {import_path}: {source:#}")]
    Decode {
        import_path: ImportPath,
        format: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SessionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SessionError::QueryFailed { .. } | SessionError::MalformedMetadata { .. } => {
                FailureKind::Query
            }
            SessionError::ArtifactIo { .. } | SessionError::MissingArtifact { .. } => {
                FailureKind::ArtifactIo
            }
            SessionError::Decode { .. } => FailureKind::Decode,
        }
    }

    /// The import path the error is about, when there is one.
    pub fn import_path(&self) -> Option<&ImportPath> {
        match self {
            SessionError::ArtifactIo { import_path, .. }
            | SessionError::MissingArtifact { import_path }
            | SessionError::Decode { import_path, .. } => Some(import_path),
            SessionError::QueryFailed { .. } | SessionError::MalformedMetadata { .. } => None,
        }
    }
}

/// Why an import could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveReason {
    /// Special and executable packages are never resolved.
    #[error("{kind} packages cannot be imported")]
    Excluded { kind: DependencyKind },

    /// The path is still being resolved further up the same import chain.
    #[error("import cycle")]
    Cycle,

    /// The source checker failed; carries its rendered error chain.
    #[error("{0}")]
    Source(String),
}

/// Failure to resolve one import path. Not fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to resolve {path}: {reason}")]
pub struct ResolveError {
    pub path: ImportPath,
    pub reason: ResolveReason,
}

impl ResolveError {
    pub fn excluded(path: ImportPath, kind: DependencyKind) -> Self {
        Self {
            path,
            reason: ResolveReason::Excluded { kind },
        }
    }

    pub fn cycle(path: ImportPath) -> Self {
        Self {
            path,
            reason: ResolveReason::Cycle,
        }
    }

    pub fn source(path: ImportPath, err: &anyhow::Error) -> Self {
        Self {
            path,
            reason: ResolveReason::Source(format!("{err:#}")),
        }
    }

    pub fn kind(&self) -> FailureKind {
        FailureKind::Resolution
    }
}

#[cfg(test)]
#[path = "../tests/error_tests.rs"]
mod error_tests;
