//! Command-line front end for inspecting how a target's dependencies are
//! classified.
//!
//! The CLI builds the dependency catalog only. It never decodes artifacts,
//! checks source or fires rebuilds.

pub mod args;
pub mod report;
pub mod tracing_config;

pub use args::{CatalogArgs, CliArgs, Command, OutputFormat};

use anyhow::{Context, Result};
use hybrid_catalog::{Classifier, DependencyCatalog, ListCommand, MetadataQuery, RecordedQuery};
use hybrid_common::SessionConfig;
use std::path::Path;

/// Build the catalog described by `args` and render it.
///
/// Relative paths in `args` are resolved against `cwd`.
pub fn run_catalog(args: &CatalogArgs, cwd: &Path, color: bool) -> Result<String> {
    let config = match &args.config {
        Some(path) => SessionConfig::from_file(&cwd.join(path))?,
        None => SessionConfig::default(),
    };
    let dir = args.dir.as_ref().map_or_else(|| cwd.to_path_buf(), |dir| cwd.join(dir));

    let query: Box<dyn MetadataQuery> = match &args.metadata {
        Some(path) => {
            let path = cwd.join(path);
            Box::new(
                RecordedQuery::from_file(&path)
                    .with_context(|| format!("failed to read metadata {}", path.display()))?,
            )
        }
        None => Box::new(ListCommand::from_config(&config)),
    };

    let catalog = DependencyCatalog::build(
        query.as_ref(),
        &Classifier::from_config(&config),
        &args.target,
        &dir,
    )?;
    tracing::debug!(records = catalog.records().len(), "catalog ready");

    match args.format {
        OutputFormat::Text => Ok(report::render_text(&catalog, color)),
        OutputFormat::Json => report::render_json(&catalog),
    }
}
