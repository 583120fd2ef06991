//! Catalog rendering.

use anyhow::{Context, Result};
use colored::Colorize;
use hybrid_catalog::{CatalogSummary, DependencyCatalog, DependencyRecord, Disposition};
use hybrid_common::ImportPath;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogView<'a> {
    target: &'a ImportPath,
    dir: &'a Path,
    records: Vec<RecordView<'a>>,
    summary: CatalogSummary,
}

#[derive(Serialize)]
struct RecordView<'a> {
    #[serde(flatten)]
    record: &'a DependencyRecord,
    disposition: Disposition,
}

/// Pretty-printed JSON: every record with its disposition, then the summary.
pub fn render_json(catalog: &DependencyCatalog) -> Result<String> {
    let view = CatalogView {
        target: catalog.target(),
        dir: catalog.dir(),
        records: catalog
            .records()
            .iter()
            .map(|record| RecordView {
                record,
                disposition: record.disposition(),
            })
            .collect(),
        summary: catalog.summary(),
    };
    serde_json::to_string_pretty(&view).context("failed to serialize catalog")
}

/// One line per record, aligned on the disposition column, followed by a
/// summary line.
pub fn render_text(catalog: &DependencyCatalog, color: bool) -> String {
    let mut out = String::new();
    let width = catalog
        .records()
        .iter()
        .map(|record| record.import_path.as_str().len())
        .max()
        .unwrap_or(0);

    for record in catalog.records() {
        let label = format!("{:<8}", record.disposition().to_string());
        let line = format!(
            "{}  {:<width$}  {}",
            paint(&label, record.disposition(), color),
            record.import_path.as_str(),
            detail(record)
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let summary = catalog.summary();
    let _ = writeln!(
        out,
        "{}: {} binary-usable, {} source fallback ({} stale), {} excluded",
        catalog.target(),
        summary.binary_usable,
        summary.source_fallback,
        summary.stale,
        summary.excluded
    );
    out
}

fn detail(record: &DependencyRecord) -> String {
    match record.disposition() {
        Disposition::Excluded => format!("({})", record.kind),
        Disposition::BinaryUsable => match &record.artifact_path {
            Some(path) => path.display().to_string(),
            // Opening the artifacts would fail the session.
            None => "(no artifact location)".to_string(),
        },
        Disposition::SourceFallback => match &record.stale_reason {
            Some(reason) => format!("(stale: {reason})"),
            None => "(stale)".to_string(),
        },
    }
}

fn paint(label: &str, disposition: Disposition, color: bool) -> String {
    if !color {
        return label.to_string();
    }
    match disposition {
        Disposition::BinaryUsable => label.green().to_string(),
        Disposition::SourceFallback => label.yellow().to_string(),
        Disposition::Excluded => label.dimmed().to_string(),
    }
}

#[cfg(test)]
#[path = "../tests/report_tests.rs"]
mod report_tests;
