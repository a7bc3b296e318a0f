use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gravata::channels::web::{GatewayState, start_server};
use gravata::config::{Config, LogFormat};
use gravata::db::connect_from_config;

const DEFAULT_LOG_FILTER: &str = "gravata=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "gravata", version, about = "Legal practice management REST API")]
struct Cli {
    /// Extra dotenv file loaded after `.env`.
    #[arg(long, env = "GRAVATA_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Address to bind (overrides GRAVATA_HOST).
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to bind (overrides GRAVATA_PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Start with an empty store instead of the demonstration dataset.
    #[arg(long)]
    no_seed: bool,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = self.host {
            config.gateway.host = host;
        }
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if self.no_seed {
            config.database.seed_demo = false;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Variables already set in the environment win over .env entries.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display()))?;
    }

    let mut config = Config::from_env().context("invalid configuration")?;
    cli.apply(&mut config);
    init_tracing(config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        seed_demo = config.database.seed_demo,
        upcoming_days = config.practice.upcoming_days,
        utc_offset = %config.practice.utc_offset,
        "Starting gravata"
    );

    let store = connect_from_config(&config.database)
        .await
        .context("failed to initialize the practice store")?;
    let state = Arc::new(GatewayState::new(store, config.practice));
    start_server(config.gateway.socket_addr(), Arc::clone(&state)).await?;

    wait_for_shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    state.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
