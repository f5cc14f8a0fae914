//! SLPK Mesher CLI
//!
//! Convert an SLPK scene layer package into textured OBJ meshes.

use clap::Parser;
use slpk_mesher::{convert, ConvertConfig, SrsDefinition};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slpk2obj")]
#[command(
    author,
    version,
    about = "Convert SLPK scene layers into textured OBJ meshes",
    long_about = None
)]
struct Cli {
    /// Input SLPK archive (or extracted directory)
    input: PathBuf,

    /// Output directory
    output: PathBuf,

    /// Write into an existing output directory
    #[arg(long)]
    overwrite: bool,

    /// Destination spatial reference (e.g. "EPSG:3857", "4978")
    #[arg(long, default_value = "EPSG:3857", value_parser = parse_srs)]
    srs: SrsDefinition,

    /// Worker threads (0 = one per CPU)
    #[arg(long, default_value = "0")]
    threads: usize,
}

fn parse_srs(s: &str) -> Result<SrsDefinition, String> {
    s.parse().map_err(|e: slpk_mesher::ConvertError| e.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = ConvertConfig {
        srs: cli.srs,
        overwrite: cli.overwrite,
        threads: cli.threads,
        ..ConvertConfig::default()
    };

    let stats = convert(&cli.input, &cli.output, &config)?;

    println!("Converted {:?} to {:?}", cli.input, cli.output);
    println!("  Nodes: {}", stats.nodes);
    println!(
        "  Submeshes: {} ({} with rebuilt atlases)",
        stats.submeshes, stats.repacked
    );
    println!("  Centre: {} {}", stats.center.x, stats.center.y);

    Ok(())
}
