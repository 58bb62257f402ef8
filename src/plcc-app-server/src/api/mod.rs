//! REST API routes and handlers.
//!
//! Four POST endpoints, each a thin mapping from a JSON body to one tool
//! invocation and from its result back to JSON.

mod compile;
pub mod endpoints;
pub mod extract;
pub mod types;

use std::sync::Arc;

use axum::{Router, routing::post};

use crate::state::AppState;

pub use types::{
    CompileStResponse, GenerateDebugResponse, GenerateGlueVarsResponse, GenerateStResponse,
    ToolOutput,
};

/// Create the API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-st", post(compile::generate_st))
        .route("/compile-st", post(compile::compile_st))
        .route("/generate-debug", post(compile::generate_debug))
        .route("/generate-gluevars", post(compile::generate_gluevars))
}
