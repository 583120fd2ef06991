//! Metadata records and their classification.
//!
//! The query tool emits one JSON object per package, concatenated without a
//! surrounding array. Only a handful of fields matter here:
//!
//! ```json
//! {"ImportPath": "fmt", "Name": "fmt", "Target": "/pkg/fmt.a", "Stale": false}
//! {"ImportPath": "example.com/app", "Name": "main", "Stale": true,
//!  "StaleReason": "build ID mismatch"}
//! ```
//!
//! Everything else in the object is ignored.

use hybrid_common::{DependencyKind, ImportPath, InvalidImportPath, SessionConfig};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRecord {
    import_path: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    stale: bool,
    #[serde(default)]
    stale_reason: Option<String>,
    #[serde(default)]
    name: String,
}

/// How the importer will treat a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    /// Decode the artifact; never touch source.
    BinaryUsable,
    /// Type-check from source on demand.
    SourceFallback,
    /// Never resolved by the importer.
    Excluded,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::BinaryUsable => f.write_str("binary"),
            Disposition::SourceFallback => f.write_str("source"),
            Disposition::Excluded => f.write_str("excluded"),
        }
    }
}

/// One dependency of the target module. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    pub import_path: ImportPath,
    /// Location of the compiled artifact as reported by the query. A
    /// binary-usable record without one fails the session when artifacts
    /// are opened.
    pub artifact_path: Option<PathBuf>,
    pub stale: bool,
    pub stale_reason: Option<String>,
    pub kind: DependencyKind,
}

impl DependencyRecord {
    pub fn disposition(&self) -> Disposition {
        if !self.kind.is_importable() {
            Disposition::Excluded
        } else if self.stale {
            Disposition::SourceFallback
        } else {
            Disposition::BinaryUsable
        }
    }

    /// Stale ordinary packages get an out-of-band rebuild in rebuild mode.
    pub fn needs_rebuild(&self) -> bool {
        self.kind.is_importable() && self.stale
    }
}

/// Assigns a [`DependencyKind`] to each record.
#[derive(Debug, Clone)]
pub struct Classifier {
    special_paths: FxHashSet<String>,
    executable_name: String,
}

impl Classifier {
    pub fn new<I, S>(special_paths: I, executable_name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            special_paths: special_paths.into_iter().map(Into::into).collect(),
            executable_name: executable_name.into(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.special_paths.iter().cloned(),
            config.executable_name.clone(),
        )
    }

    /// Import paths classified as special whether or not a query lists them.
    pub fn special_paths(&self) -> impl Iterator<Item = &str> {
        self.special_paths.iter().map(String::as_str)
    }

    /// Special wins over executable: a built-in is never a program.
    pub fn kind(&self, import_path: &str, package_name: &str) -> DependencyKind {
        if self.special_paths.contains(import_path) {
            DependencyKind::Special
        } else if package_name == self.executable_name {
            DependencyKind::Executable
        } else {
            DependencyKind::Ordinary
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// A record stream that cannot be turned into a catalog.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record {index}: {source}")]
    Syntax {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record {index}: {source}")]
    InvalidPath {
        index: usize,
        #[source]
        source: InvalidImportPath,
    },

    #[error("record {index}: duplicate import path {path} (first seen in record {first})")]
    Duplicate {
        index: usize,
        first: usize,
        path: ImportPath,
    },
}

/// Decode a concatenated stream of JSON records, in order.
///
/// Decoding stops at the first malformed or truncated record; no partial
/// result is returned.
pub fn parse_records(
    bytes: &[u8],
    classifier: &Classifier,
) -> Result<Vec<DependencyRecord>, RecordError> {
    let mut records = Vec::new();
    let mut seen: FxHashMap<ImportPath, usize> = FxHashMap::default();

    let stream = serde_json::Deserializer::from_slice(bytes).into_iter::<RawRecord>();
    for (index, raw) in stream.enumerate() {
        let raw = raw.map_err(|source| RecordError::Syntax { index, source })?;
        let import_path = ImportPath::new(raw.import_path)
            .map_err(|source| RecordError::InvalidPath { index, source })?;

        if let Some(&first) = seen.get(&import_path) {
            return Err(RecordError::Duplicate {
                index,
                first,
                path: import_path,
            });
        }
        seen.insert(import_path.clone(), index);

        let kind = classifier.kind(import_path.as_str(), &raw.name);
        let artifact_path = (!raw.target.is_empty()).then(|| PathBuf::from(raw.target));
        let record = DependencyRecord {
            import_path,
            artifact_path,
            stale: raw.stale,
            stale_reason: raw.stale_reason.filter(|reason| !reason.is_empty()),
            kind,
        };
        trace!(
            import_path = %record.import_path,
            kind = %record.kind,
            disposition = %record.disposition(),
            "classified record"
        );
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
#[path = "../tests/record_tests.rs"]
mod record_tests;
