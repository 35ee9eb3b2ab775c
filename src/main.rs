//! Binary entrypoint for the photo kiosk server.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use photo_kiosk::config::Configuration;
use photo_kiosk::state::KioskState;
use photo_kiosk::store::PhotoStore;
use photo_kiosk::web::{self, AppState};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "photo-kiosk", about = "Web-served synchronized photo kiosk")]
struct Cli {
    /// Path to YAML config file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the slideshow tick interval (e.g. "5s")
    #[arg(long, value_name = "DURATION")]
    interval: Option<humantime::Duration>,

    /// Override the listen address
    #[arg(long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("photo_kiosk={level}").parse()?)
        .add_directive(format!("tower_http={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = match &cli.config {
        Some(path) => Configuration::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(interval) = cli.interval {
        cfg.slideshow_interval = interval.into();
    }
    if let Some(listen) = cli.listen {
        cfg.listen_address = listen;
    }
    cfg.validate().context("validating configuration")?;

    fs::create_dir_all(&cfg.storage_path).with_context(|| {
        format!(
            "creating photo storage directory {}",
            cfg.storage_path.display()
        )
    })?;

    let store = PhotoStore::new(&cfg.storage_path, &cfg.allowed_extensions);
    info!(
        count = store.list().len(),
        path = %cfg.storage_path.display(),
        interval = %humantime::format_duration(cfg.slideshow_interval),
        "photo storage ready"
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            web::shutdown_signal().await;
            info!("shutdown signal received");
            shutdown.cancel();
        });
    }

    let app = AppState::new(
        KioskState::new(store),
        cfg.slideshow_interval,
        shutdown.clone(),
    );
    web::serve(cfg.listen_address, app).await
}
