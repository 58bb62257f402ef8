//! API response types.

use std::collections::BTreeMap;

use plcc_exec::InvocationResult;
use serde::Serialize;

/// Process fields shared by every compiler response.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// The tool was killed after exceeding the configured timeout.
    pub timed_out: bool,
}

impl From<&InvocationResult> for ToolOutput {
    fn from(result: &InvocationResult) -> Self {
        Self {
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            exit_code: result.exit_code,
            timed_out: result.timed_out(),
        }
    }
}

/// Response of `POST /generate-st`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateStResponse {
    #[serde(flatten)]
    pub tool: ToolOutput,
    pub program_st: Option<String>,
}

/// Response of `POST /compile-st`.
#[derive(Debug, Clone, Serialize)]
pub struct CompileStResponse {
    #[serde(flatten)]
    pub tool: ToolOutput,
    /// Every file the translator produced, keyed by file name.
    pub files: BTreeMap<String, String>,
}

/// Response of `POST /generate-debug`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateDebugResponse {
    #[serde(flatten)]
    pub tool: ToolOutput,
    /// The program as left by the tool, which may rewrite it in place.
    pub program_st: Option<String>,
    pub debug_c: Option<String>,
}

/// Response of `POST /generate-gluevars`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateGlueVarsResponse {
    #[serde(flatten)]
    pub tool: ToolOutput,
    pub glue_vars_c: Option<String>,
}
