use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio::build::build_site;
use folio::config::Config;
use folio::filters::Filters;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio", version, about = "Builds a static site")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory
    Build {
        /// The project directory, or any directory below it
        #[arg(long, default_value = ".")]
        project: PathBuf,

        /// Write the site here instead of the configured output directory
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // default to info if RUST_LOG isn't set
    let log_spec = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_spec))
        .with_target(false)
        .compact()
        .init();

    match Cli::parse().command {
        Command::Build { project, output } => {
            let config = Config::from_directory(&project, output.as_deref())
                .context("loading configuration")?;
            build_site(&config, &Filters::standard()).context("building site")?;
        }
    }
    Ok(())
}
