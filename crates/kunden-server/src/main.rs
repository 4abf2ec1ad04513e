//! kunden server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), layers
//! `KUNDEN_*` environment variables on top, and serves the REST API over
//! HTTP.

use std::path::PathBuf;

use clap::Parser;
use kunden_server::ServerConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Customer registry REST server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = ServerConfig::load(&cli.config)?;

  kunden_server::serve(config).await
}
