//! Folio CLI - static site generator for portfolios and blogs.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;
mod watcher;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Static site generator for portfolios and blogs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to folio.toml config file
    #[arg(short, long, default_value = "folio.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter site next to the config file
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Build the static site
    Build {
        /// Output directory (defaults to config or "public")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Treat broken internal links as errors
        #[arg(long)]
        strict: bool,

        /// Include pages marked as drafts
        #[arg(long)]
        drafts: bool,
    },

    /// Validate the site without writing output
    Check {
        /// Treat broken internal links as errors
        #[arg(long)]
        strict: bool,

        /// Include pages marked as drafts
        #[arg(long)]
        drafts: bool,
    },

    /// Rebuild the site whenever sources change
    Watch {
        /// Include pages marked as drafts
        #[arg(long)]
        drafts: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes).await?;
        }
        Commands::Build {
            output,
            strict,
            drafts,
        } => {
            commands::build::run(&cli.config, output, strict, drafts).await?;
        }
        Commands::Check { strict, drafts } => {
            commands::check::run(&cli.config, strict, drafts).await?;
        }
        Commands::Watch { drafts } => {
            commands::watch::run(&cli.config, drafts).await?;
        }
    }

    Ok(())
}
