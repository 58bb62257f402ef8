//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory under which per-request workspaces are created.
    /// Defaults to the system temp directory.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Limit on a single tool run in seconds.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout: u64,

    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Origins allowed to call the API from a browser.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// How long browsers may cache a preflight response, in seconds.
    #[serde(default = "default_cors_max_age")]
    pub cors_max_age: u64,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,

    /// External compiler tools.
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_tool_timeout() -> u64 {
    60
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_cors_origins() -> Vec<String> {
    [
        "https://autonomy-edge.com",
        "https://www.autonomy-edge.com",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_cors_max_age() -> u64 {
    86400 // 24 hours
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            scratch_dir: None,
            tool_timeout: default_tool_timeout(),
            max_body_size: default_max_body_size(),
            cors_origins: default_cors_origins(),
            cors_max_age: default_cors_max_age(),
            shutdown_timeout: default_shutdown_timeout(),
            tools: ToolsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables on top of the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from a variable lookup, e.g. `std::env::var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = var("PLCC_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(dir) = var("PLCC_SCRATCH_DIR") {
            config.scratch_dir = Some(PathBuf::from(dir));
        }

        if let Some(timeout) = var("PLCC_TOOL_TIMEOUT") {
            config.tool_timeout = timeout
                .parse()
                .with_context(|| format!("PLCC_TOOL_TIMEOUT is not a number: {timeout}"))?;
        }

        if let Some(size) = var("PLCC_MAX_BODY_SIZE") {
            config.max_body_size = size
                .parse()
                .with_context(|| format!("PLCC_MAX_BODY_SIZE is not a number: {size}"))?;
        }

        if let Some(origins) = var("PLCC_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(path) = var("PLCC_XML2ST_PATH") {
            config.tools.xml2st.path = PathBuf::from(path);
        }

        if let Some(path) = var("PLCC_IEC2C_PATH") {
            config.tools.iec2c.path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.tool_timeout > 0,
            "tool_timeout must be at least 1 second"
        );
        Ok(())
    }

    /// Directory for per-request workspaces.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Get tool timeout as Duration.
    pub fn tool_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.tool_timeout)
    }

    /// Get preflight cache lifetime as Duration.
    pub fn cors_max_age_duration(&self) -> Duration {
        Duration::from_secs(self.cors_max_age)
    }
}

/// Locations of the external compiler tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// XML to Structured Text generator, also used for debug and glue
    /// variable generation.
    #[serde(default = "default_xml2st")]
    pub xml2st: ToolConfig,
    /// Structured Text to C translator.
    #[serde(default = "default_iec2c")]
    pub iec2c: ToolConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            xml2st: default_xml2st(),
            iec2c: default_iec2c(),
        }
    }
}

fn default_xml2st() -> ToolConfig {
    ToolConfig::new("/usr/bin/xml2st")
}

fn default_iec2c() -> ToolConfig {
    ToolConfig::new("/usr/bin/iec2c")
}

/// One external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable path.
    pub path: PathBuf,
    /// Arguments placed before the endpoint's fixed flags, e.g. an include
    /// directory for iec2c.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl ToolConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extra_args: Vec::new(),
        }
    }
}
