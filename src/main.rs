//! ODAS bridge daemon entry point.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use odas_bridge::cli::Args;
use odas_bridge::config::load_config;
use odas_bridge::{logger, App};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(args.log_dir.as_deref())?;

    let mut config = load_config(args.config.as_deref())?;
    args.apply_to(&mut config);
    info!(?config, "Configuration loaded");

    let app = App::new(config).context("Invalid configuration")?;
    let bound = app.bind().await?;
    let addrs = bound.local_addrs()?;
    info!(
        tracked = %addrs.tracked,
        candidate = %addrs.candidate,
        tcp_tracked = ?addrs.tcp_tracked,
        tcp_candidate = ?addrs.tcp_candidate,
        "Listening for ODAS reports"
    );

    bound.run().await?;
    info!("ODAS bridge stopped");
    Ok(())
}
