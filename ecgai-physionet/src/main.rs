//! ecgai-physionet - PTB-XL record service
//!
//! Serves assembled PTB-XL records (signal, clinical metadata and SCP
//! diagnostic codes) over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ecgai_common::config::{
    default_config_path, ensure_directory_exists, load_toml_config, DataFolderResolver, TomlConfig,
};
use ecgai_physionet::{build_router, AppState, PtbXl, PtbXlConfig, SampleRate};

/// Command-line arguments for ecgai-physionet
#[derive(Parser, Debug)]
#[command(name = "ecgai-physionet")]
#[command(about = "PTB-XL ECG record service backed by PhysioNet")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "ECGAI_PORT")]
    port: Option<u16>,

    /// Folder for cached reference tables
    #[arg(short, long)]
    data_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "ECGAI_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match args.config.clone().or_else(default_config_path) {
        Some(path) => load_toml_config(&path)?,
        None => TomlConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ecgai-physionet v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Reject a bad default before serving anything
    SampleRate::try_from(config.default_sample_rate)
        .context("Invalid default_sample_rate in configuration")?;

    let data_folder = DataFolderResolver::new()
        .with_cli_arg(args.data_folder)
        .with_toml_config(&config)
        .resolve();
    ensure_directory_exists(&data_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize data folder: {}", e))?;
    info!("Data folder: {}", data_folder.display());

    let ptbxl = PtbXl::new(
        PtbXlConfig::from_toml(&config, data_folder),
        &config.archive_base_url,
        &config.archive_version,
    )
    .context("Failed to initialize PTB-XL accessor")?;

    let state = AppState::new(ptbxl, config.default_sample_rate);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
