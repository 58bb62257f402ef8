//! PLC compiler server binary.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use plcc_app_server::{ServerConfig, run_with_shutdown};

/// PLC compiler server
#[derive(Parser)]
#[command(name = "plcc-server")]
#[command(about = "HTTP API over the xml2st and iec2c PLC compiler tools")]
#[command(version)]
struct Args {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Directory for per-request workspaces
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Tool timeout in seconds
    #[arg(long)]
    tool_timeout: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

async fn shutdown_signal(shutdown_timeout: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown (timeout: {}s)...", shutdown_timeout);
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown (timeout: {}s)...", shutdown_timeout);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    setup_logging(&args.log_level, args.json_logs);

    let loaded = match &args.config {
        Some(path) => ServerConfig::load(path)
            .map_err(|e| error!("Failed to load config from {}: {}", path, e)),
        None => ServerConfig::from_env()
            .map_err(|e| error!("Failed to load config from environment: {}", e)),
    };
    let Ok(mut config) = loaded else {
        return ExitCode::FAILURE;
    };

    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(dir) = args.scratch_dir {
        config.scratch_dir = Some(dir);
    }
    if let Some(timeout) = args.tool_timeout {
        config.tool_timeout = timeout;
    }

    info!("xml2st: {}", config.tools.xml2st.path.display());
    info!("iec2c: {}", config.tools.iec2c.path.display());
    info!("Press Ctrl+C to stop");

    let shutdown_timeout = config.shutdown_timeout;
    let server = run_with_shutdown(config, shutdown_signal(shutdown_timeout));

    let result = tokio::select! {
        result = server => result,
        _ = async {
            shutdown_signal(shutdown_timeout).await;
            tokio::time::sleep(std::time::Duration::from_secs(shutdown_timeout)).await;
        } => {
            error!("In-flight requests did not finish within {}s, exiting", shutdown_timeout);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}
