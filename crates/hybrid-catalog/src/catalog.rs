//! The classified dependency closure of one target.

use crate::query::MetadataQuery;
use crate::record::{Classifier, DependencyRecord, Disposition, parse_records};
use hybrid_common::{ImportPath, SessionError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, debug_span};

/// Record counts per disposition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub binary_usable: usize,
    pub source_fallback: usize,
    /// Records that would get an out-of-band rebuild.
    pub stale: usize,
    pub excluded: usize,
}

/// Every dependency of a target, in the order the query reported them.
///
/// The query lists dependencies before their dependents, and that order is
/// preserved: decoding artifacts in catalog order means a package's
/// dependencies have always been decoded first.
#[derive(Debug, Clone)]
pub struct DependencyCatalog {
    target: ImportPath,
    dir: PathBuf,
    records: Vec<DependencyRecord>,
}

impl DependencyCatalog {
    /// Run `query` once and classify its output.
    pub fn build(
        query: &dyn MetadataQuery,
        classifier: &Classifier,
        target: &ImportPath,
        dir: &Path,
    ) -> Result<Self, SessionError> {
        let _span = debug_span!("build_catalog", target = %target, dir = %dir.display()).entered();

        let bytes = query.run(target, dir)?;
        let records =
            parse_records(&bytes, classifier).map_err(|err| SessionError::MalformedMetadata {
                target: target.clone(),
                dir: dir.to_path_buf(),
                reason: err.to_string(),
            })?;

        let catalog = Self {
            target: target.clone(),
            dir: dir.to_path_buf(),
            records,
        };
        let summary = catalog.summary();
        debug!(
            source = %query.describe(target),
            records = catalog.records.len(),
            binary_usable = summary.binary_usable,
            source_fallback = summary.source_fallback,
            stale = summary.stale,
            excluded = summary.excluded,
            "classified dependency closure"
        );
        Ok(catalog)
    }

    pub fn target(&self) -> &ImportPath {
        &self.target
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn records(&self) -> &[DependencyRecord] {
        &self.records
    }

    pub fn get(&self, import_path: &str) -> Option<&DependencyRecord> {
        self.records
            .iter()
            .find(|record| record.import_path.as_str() == import_path)
    }

    pub fn binary_usable(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.with_disposition(Disposition::BinaryUsable)
    }

    pub fn source_fallback(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.with_disposition(Disposition::SourceFallback)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.with_disposition(Disposition::Excluded)
    }

    /// Records that get an out-of-band rebuild in rebuild mode.
    pub fn stale(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.records.iter().filter(|record| record.needs_rebuild())
    }

    pub fn summary(&self) -> CatalogSummary {
        let mut summary = CatalogSummary::default();
        for record in &self.records {
            match record.disposition() {
                Disposition::BinaryUsable => summary.binary_usable += 1,
                Disposition::SourceFallback => summary.source_fallback += 1,
                Disposition::Excluded => summary.excluded += 1,
            }
            if record.needs_rebuild() {
                summary.stale += 1;
            }
        }
        summary
    }

    fn with_disposition(&self, disposition: Disposition) -> impl Iterator<Item = &DependencyRecord> {
        self.records
            .iter()
            .filter(move |record| record.disposition() == disposition)
    }
}

#[cfg(test)]
#[path = "../tests/catalog_tests.rs"]
mod catalog_tests;
