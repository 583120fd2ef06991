use clap::{Args, Parser, Subcommand, ValueEnum};
use hybrid_common::ImportPath;
use std::path::PathBuf;

/// CLI arguments for the hybrid binary.
#[derive(Parser, Debug)]
#[command(
    name = "hybrid",
    version,
    about = "Inspect how the hybrid importer treats a target's dependencies"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify every dependency of TARGET as binary, source or excluded.
    Catalog(CatalogArgs),
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Import path of the target module.
    pub target: ImportPath,

    /// Working directory the metadata query runs in.
    #[arg(short = 'C', long = "dir")]
    pub dir: Option<PathBuf>,

    /// Session configuration file (JSON).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Replay a captured metadata stream instead of running the query.
    #[arg(long)]
    pub metadata: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Disable colored output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
#[path = "../tests/args_tests.rs"]
mod args_tests;
