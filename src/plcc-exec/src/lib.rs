//! PLC compiler tool execution.
//!
//! Every invocation of an external compiler tool follows the same shape:
//! - allocate a fresh, exclusively owned workspace directory
//! - write the request's input files into it
//! - run the tool with the workspace as its working directory
//! - harvest the files it produced
//! - remove the workspace, whatever happened before
//!
//! # Example
//!
//! ```rust,ignore
//! use plcc_exec::{InputFile, InvocationRequest, NamedOutput, OutputSpec, ToolRunner};
//!
//! let runner = ToolRunner::new(std::env::temp_dir());
//! let request = InvocationRequest::new("/usr/bin/xml2st")
//!     .workspace_prefix("xml2st_")
//!     .args(["--generate-st", "plc.xml"])
//!     .input(InputFile::text("plc.xml", xml))
//!     .outputs(OutputSpec::named([NamedOutput::new("program_st", "program.st")]));
//!
//! let result = runner.run(request).await?;
//! println!("exit code: {}", result.exit_code);
//! ```

mod error;
mod harvest;
mod invoke;
mod materialize;
mod pipeline;
mod types;
mod workspace;

pub use error::{ExecError, ExecResult};
pub use materialize::validate_file_name;
pub use pipeline::{DEFAULT_TOOL_TIMEOUT, ToolRunner};
pub use types::{
    InputContents, InputFile, InvocationRequest, InvocationResult, InvocationStatus, NamedOutput,
    OutputSpec,
};
pub use workspace::Workspace;
