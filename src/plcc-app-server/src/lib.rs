//! PLC compiler service - HTTP API over the xml2st and iec2c tools.
//!
//! This crate provides:
//! - `POST /generate-st`: PLCopen XML to Structured Text
//! - `POST /compile-st`: Structured Text to C
//! - `POST /generate-debug`: debug artifacts for a program
//! - `POST /generate-gluevars`: glue variables for located variables
//!
//! Each request runs its tool in a fresh workspace that is removed before
//! the response is sent. See `plcc_exec` for the pipeline itself.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;


use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::ServerConfig;
pub use error::{AppError, AppResult};
pub use state::AppState;

/// Run the server with the given configuration.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    run_with_shutdown(config, std::future::pending()).await
}

/// Run the server with graceful shutdown support.
pub async fn run_with_shutdown<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    let addr: SocketAddr = config.listen_addr.parse()?;
    let state = Arc::new(AppState::new(config));
    info!(
        scratch_root = %state.runner.scratch_root().display(),
        tool_timeout_secs = state.runner.default_timeout().as_secs(),
        "Tool runner ready"
    );

    let app = create_router(state);

    info!("Starting PLC compiler server on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shut down");
    Ok(())
}

/// Create the application router.
///
/// Built once at startup; the state is an immutable snapshot shared by
/// every request.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = DefaultBodyLimit::max(state.config.max_body_size);

    Router::new()
        .merge(api::routes())
        .layer(body_limit)
        .layer(axum::middleware::from_fn(middleware::timing_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the configured origins: POST only, no credentials.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| {
            if origin == "*" {
                warn!("Ignoring wildcard CORS origin; list origins explicitly");
                return None;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false)
        .max_age(config.cors_max_age_duration())
}
