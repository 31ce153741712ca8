//! lightpack - lightmap atlas repack tool
//!
//! Packs the lightmap blocks a scene actually uses into dense power-of-two
//! atlas pages and rewrites each renderer's lightmap scale/offset.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lightpack_cli::{RepackConfig, RepackOptions, repack};

#[derive(Parser)]
#[command(name = "lightpack")]
#[command(about = "Lightmap atlas repack tool")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repack lightmaps described by a manifest
    Repack {
        /// Path to repack.toml manifest
        #[arg(default_value = "repack.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pack and report without writing files
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate manifest and scene without repacking
    Check {
        /// Path to repack.toml manifest
        #[arg(default_value = "repack.toml")]
        manifest: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Repack {
            manifest,
            output,
            dry_run,
        } => {
            tracing::info!("Repacking from {:?}", manifest);
            let config = RepackConfig::load(&manifest)?;
            let options = RepackOptions {
                output_dir: output,
                dry_run,
            };
            let report = repack::run(&config, &options)?;
            report.print_summary();
            tracing::info!("Repack complete!");
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = RepackConfig::load(&manifest)?;
            let renderers = repack::check(&config)?;
            tracing::info!("Manifest is valid! ({} lightmapped renderers)", renderers);
        }
    }

    Ok(())
}
