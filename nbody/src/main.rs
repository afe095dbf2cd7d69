#![deny(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = nbody::Cli::parse();
    let summary = nbody::run(&cli)?;
    if let Some(title) = &summary.last_title {
        tracing::info!("{title}");
    }
    Ok(())
}
