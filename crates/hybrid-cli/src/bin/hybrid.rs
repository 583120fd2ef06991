use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;

use hybrid_cli::{CliArgs, Command};

fn main() -> Result<()> {
    // Only installs a subscriber when HYBRID_LOG or RUST_LOG is set.
    hybrid_cli::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;

    match args.command {
        Command::Catalog(catalog) => {
            let color = !catalog.no_color && std::io::stdout().is_terminal();
            let output = hybrid_cli::run_catalog(&catalog, &cwd, color)?;
            print!("{output}");
            if !output.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
