use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Convert an HTML file to Markdown on stdout
#[derive(Parser)]
#[command(name = "demark", version, about)]
struct Cli {
    /// Path to the HTML file to convert
    path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(path) = cli.path else {
        println!("No input file");
        return Ok(());
    };

    let html = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {} as UTF-8 text", path.display()))?;
    let markdown = demark::convert(&html)?;
    println!("{markdown}");

    Ok(())
}
