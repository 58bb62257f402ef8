//! Compiler endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::error::AppResult;
use crate::state::AppState;

use super::endpoints::{COMPILE_ST, GENERATE_DEBUG, GENERATE_GLUEVARS, GENERATE_ST, invoke};
use super::extract::JsonObject;
use super::types::{
    CompileStResponse, GenerateDebugResponse, GenerateGlueVarsResponse, GenerateStResponse,
};

/// Generate Structured Text from PLCopen XML (`plc_xml`).
pub async fn generate_st(
    State(state): State<Arc<AppState>>,
    body: JsonObject,
) -> AppResult<Json<GenerateStResponse>> {
    let mut result = invoke(&state, &GENERATE_ST, &body).await?;

    Ok(Json(GenerateStResponse {
        tool: (&result).into(),
        program_st: result.outputs.remove("program_st"),
    }))
}

/// Translate Structured Text (`program_st`) to C.
pub async fn compile_st(
    State(state): State<Arc<AppState>>,
    body: JsonObject,
) -> AppResult<Json<CompileStResponse>> {
    let mut result = invoke(&state, &COMPILE_ST, &body).await?;

    Ok(Json(CompileStResponse {
        tool: (&result).into(),
        files: std::mem::take(&mut result.outputs),
    }))
}

/// Generate debug artifacts from `program_st` and `variables_csv`.
pub async fn generate_debug(
    State(state): State<Arc<AppState>>,
    body: JsonObject,
) -> AppResult<Json<GenerateDebugResponse>> {
    let mut result = invoke(&state, &GENERATE_DEBUG, &body).await?;

    Ok(Json(GenerateDebugResponse {
        tool: (&result).into(),
        program_st: result.outputs.remove("program_st"),
        debug_c: result.outputs.remove("debug_c"),
    }))
}

/// Generate glue variables from `located_variables_h`.
pub async fn generate_gluevars(
    State(state): State<Arc<AppState>>,
    body: JsonObject,
) -> AppResult<Json<GenerateGlueVarsResponse>> {
    let mut result = invoke(&state, &GENERATE_GLUEVARS, &body).await?;

    Ok(Json(GenerateGlueVarsResponse {
        tool: (&result).into(),
        glue_vars_c: result.outputs.remove("glue_vars_c"),
    }))
}
