//! Dependency catalog for the hybrid package importer.
//!
//! The catalog runs the external metadata query once, decodes its stream of
//! JSON records and classifies every dependency:
//! - `BinaryUsable`: an ordinary, up-to-date package with an artifact
//! - `SourceFallback`: an ordinary package that must be type-checked from source
//! - `Excluded`: a special or executable package that is never resolved
//!
//! Classification is pure. No artifact is touched here; opening artifacts is
//! the importer's job.

pub mod query;
pub use query::{ListCommand, MetadataQuery, RecordedQuery};

pub mod record;
pub use record::{Classifier, DependencyRecord, Disposition, RecordError, parse_records};

pub mod catalog;
pub use catalog::{CatalogSummary, DependencyCatalog};
