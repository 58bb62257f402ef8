//! Error types for tool execution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that prevent an invocation from producing a result.
///
/// A tool that runs and exits nonzero is not an error; its exit code is
/// reported in [`crate::InvocationResult`].
#[derive(Debug, Error)]
pub enum ExecError {
    /// The workspace directory could not be created.
    #[error("failed to create workspace under {}: {source}", root.display())]
    CreateWorkspace {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A blocking workspace task panicked or was cancelled.
    #[error("workspace task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// An input file name is not a plain file name.
    #[error("invalid input file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: &'static str },

    /// An input file could not be written into the workspace.
    #[error("failed to write input file {name}: {source}")]
    WriteInput {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The tool could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Waiting on the running tool failed.
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for tool execution.
pub type ExecResult<T> = Result<T, ExecError>;
