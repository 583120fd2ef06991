//! Diagnostics for the `hybrid` binary.
//!
//! Sessions log through `tracing`; the binary decides where those events go.
//! `HYBRID_LOG` (or `RUST_LOG`) enables them with the usual directive
//! syntax, and `HYBRID_LOG_FORMAT` picks `text`, `tree` or `json`:
//!
//! ```bash
//! HYBRID_LOG=hybrid_importer=trace HYBRID_LOG_FORMAT=tree hybrid catalog example.com/app
//! ```
//!
//! Events always go to stderr; stdout carries the catalog report.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Rendering of session events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    /// Nested session, decode and check spans.
    Tree,
    Json,
}

impl LogFormat {
    /// Unknown names fall back to [`LogFormat::Text`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// What the binary was asked to log, read from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directives: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// `None` when neither directive variable is set. `HYBRID_LOG` shadows
    /// `RUST_LOG`.
    pub fn from_vars(
        hybrid_log: Option<String>,
        rust_log: Option<String>,
        format: Option<String>,
    ) -> Option<Self> {
        let directives = hybrid_log.or(rust_log)?;
        Some(Self {
            directives,
            format: format.as_deref().map(LogFormat::parse).unwrap_or_default(),
        })
    }

    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok();
        Self::from_vars(var("HYBRID_LOG"), var("RUST_LOG"), var("HYBRID_LOG_FORMAT"))
    }

    /// Malformed directives are skipped rather than rejected.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::builder().parse_lossy(&self.directives)
    }

    /// Install the process-wide subscriber. A second install is ignored.
    pub fn install(&self) {
        let registry = tracing_subscriber::registry().with(self.filter());
        let _ = match self.format {
            LogFormat::Text => registry
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Tree => registry
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_writer(std::io::stderr)
                        .with_indent_lines(true)
                        .with_targets(true),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
        };
    }
}

/// Install a subscriber if the environment asks for one.
pub fn init_tracing() {
    if let Some(settings) = LogSettings::from_env() {
        settings.install();
    }
}

#[cfg(test)]
#[path = "../tests/tracing_config_tests.rs"]
mod tracing_config_tests;
