//! radar-bot - interactive subscription bot
//!
//! Runs until interrupted. Shares the database file with radar-sweep.

use anyhow::{Context, Result};
use clap::Parser;
use radar_bot::poller;
use radar_common::catalog::SpotifyClient;
use radar_common::config::{ConfigOverrides, RadarConfig};
use radar_common::db;
use radar_common::messaging::TelegramBot;
use radar_common::{RadarContext, RadarSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for radar-bot
#[derive(Parser, Debug)]
#[command(name = "radar-bot")]
#[command(about = "Chat bot managing release radar subscriptions")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides env and config file)
    #[arg(short, long)]
    database: Option<PathBuf>,
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
        "Starting radar-bot v{} [{}] built {} ({})",
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
    let bot = Arc::new(TelegramBot::new(config.bot_token.clone())?);

    let ctx = RadarContext::new(
        pool,
        Arc::new(catalog),
        bot.clone(),
        RadarSettings::from(&config),
    );

    info!("Polling for messages");
    tokio::select! {
        _ = poller::run(&ctx, bot.as_ref(), config.poll_timeout_secs) => {},
        _ = shutdown_signal() => {},
    }

    ctx.db.close().await;
    info!("Bot shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
