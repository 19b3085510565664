//! radar-sweep - one pass over every tracked artist, then exit
//!
//! Meant to be run periodically by an external scheduler (cron, systemd timer).
//! Per-artist failures are logged and do not change the exit status.

use anyhow::{Context, Result};
use clap::Parser;
use radar_common::catalog::SpotifyClient;
use radar_common::config::{ConfigOverrides, RadarConfig};
use radar_common::db;
use radar_common::messaging::TelegramBot;
use radar_common::{RadarContext, RadarSettings};
use radar_sweep::run_sweep;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Command-line arguments for radar-sweep
#[derive(Parser, Debug)]
#[command(name = "radar-sweep")]
#[command(about = "Check tracked artists for new releases and notify subscribers")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides env and config file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Only check these artist ids (repeatable)
    #[arg(short, long = "artist", value_name = "ID")]
    artists: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting radar-sweep v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let overrides = ConfigOverrides {
        config_path: args.config,
        database_path: args.database,
    };
    let config = RadarConfig::load(&overrides).context("Failed to load configuration")?;
    info!("Database path: {}", config.database_path.display());

    let pool = match db::init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let catalog = SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
    )?;
    let messenger = TelegramBot::new(config.bot_token.clone())?;

    let ctx = RadarContext::new(
        pool,
        Arc::new(catalog),
        Arc::new(messenger),
        RadarSettings::from(&config),
    );

    let summary = run_sweep(&ctx, &args.artists).await?;
    if !summary.failures.is_empty() {
        info!("{} artist failures, see errors above", summary.failures.len());
    }

    ctx.db.close().await;
    Ok(())
}
