use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reactor_redis::{config::Cli, Server, ServerConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::try_from(Cli::parse()).context("invalid command line")?;

    Server::bind(config)?.start()?;

    Ok(())
}
