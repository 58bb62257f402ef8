//! Application state.

use plcc_exec::ToolRunner;
use tracing::warn;

use crate::config::ServerConfig;

/// State shared across request handlers.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug)]
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,
    /// Runs tool invocations in per-request workspaces.
    pub runner: ToolRunner,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        for tool in [&config.tools.xml2st, &config.tools.iec2c] {
            if !tool.path.exists() {
                warn!(
                    tool = %tool.path.display(),
                    "Configured tool not found, requests using it will fail"
                );
            }
        }

        let runner =
            ToolRunner::new(config.scratch_root()).with_timeout(config.tool_timeout_duration());

        Self { config, runner }
    }
}
