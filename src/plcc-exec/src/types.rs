//! Invocation request and result types.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputContents {
    /// Written as UTF-8.
    Text(String),
    /// Written byte for byte.
    Binary(Vec<u8>),
}

impl InputContents {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// A file written directly under the workspace root before the tool runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Plain file name, no directory components.
    pub name: String,
    pub contents: InputContents,
}

impl InputFile {
    pub fn text(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: InputContents::Text(contents.into()),
        }
    }

    pub fn binary(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: InputContents::Binary(contents.into()),
        }
    }
}

/// An output file probed by name after the tool exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOutput {
    /// Key the content is stored under in [`InvocationResult::outputs`].
    pub key: String,
    /// File name inside the workspace.
    pub file_name: String,
}

impl NamedOutput {
    pub fn new(key: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            file_name: file_name.into(),
        }
    }
}

/// Which files are collected from the workspace after the tool exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    /// Probe each listed file; missing files are left out of the result.
    Named(Vec<NamedOutput>),
    /// Collect every regular file under the workspace root, keyed by file
    /// name. Input files are always excluded, along with `exclude`.
    Enumerate { exclude: Vec<String> },
}

impl OutputSpec {
    pub fn named(outputs: impl IntoIterator<Item = NamedOutput>) -> Self {
        Self::Named(outputs.into_iter().collect())
    }

    /// Enumerate everything the tool left behind except the inputs.
    pub fn enumerate() -> Self {
        Self::Enumerate {
            exclude: Vec::new(),
        }
    }
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self::Named(Vec::new())
    }
}

/// Everything needed to run one tool invocation.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Tool executable.
    pub program: PathBuf,
    /// Arguments, in order. Relative file names resolve inside the workspace.
    pub args: Vec<String>,
    /// Files written before the tool runs.
    pub inputs: Vec<InputFile>,
    /// Files collected after the tool exits.
    pub outputs: OutputSpec,
    /// Prefix for the workspace directory name.
    pub workspace_prefix: String,
    /// Extra environment variables. Nothing else from the server's
    /// environment reaches the tool except `PATH`.
    pub env: Vec<(String, String)>,
    /// Overrides the runner's default timeout.
    pub timeout: Option<Duration>,
}

impl InvocationRequest {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            inputs: Vec::new(),
            outputs: OutputSpec::default(),
            workspace_prefix: "plcc_".to_string(),
            env: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, input: InputFile) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn outputs(mut self, outputs: OutputSpec) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn workspace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.workspace_prefix = prefix.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Short name of the tool for logs.
    pub fn tool_name(&self) -> String {
        tool_name(&self.program)
    }
}

pub(crate) fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

/// How the tool run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    /// The tool exited on its own, with any exit code.
    Completed,
    /// The tool was killed after exceeding its timeout.
    TimedOut,
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code. Signal deaths are reported as the negated signal
    /// number, a timeout as `-1`.
    pub exit_code: i32,
    /// Harvested files, present only for files that existed after the run.
    pub outputs: BTreeMap<String, String>,
    pub status: InvocationStatus,
}

impl InvocationResult {
    /// Content harvested under `key`, if the file was produced.
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }

    pub fn timed_out(&self) -> bool {
        self.status == InvocationStatus::TimedOut
    }

    pub fn success(&self) -> bool {
        self.status == InvocationStatus::Completed && self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = InvocationRequest::new("/usr/bin/xml2st")
            .workspace_prefix("xml2st_")
            .args(["--generate-st", "plc.xml"])
            .input(InputFile::text("plc.xml", "<project/>"))
            .timeout(Duration::from_secs(5));

        assert_eq!(request.tool_name(), "xml2st");
        assert_eq!(request.args, vec!["--generate-st", "plc.xml"]);
        assert_eq!(request.inputs.len(), 1);
        assert_eq!(request.workspace_prefix, "xml2st_");
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
        assert_eq!(request.outputs, OutputSpec::Named(vec![]));
    }

    #[test]
    fn test_result_accessors() {
        let mut outputs = BTreeMap::new();
        outputs.insert("program_st".to_string(), "PROGRAM main".to_string());
        let result = InvocationResult {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            outputs,
            status: InvocationStatus::Completed,
        };

        assert!(result.success());
        assert!(!result.timed_out());
        assert_eq!(result.output("program_st"), Some("PROGRAM main"));
        assert_eq!(result.output("debug_c"), None);
    }

    #[test]
    fn test_binary_input_bytes() {
        let input = InputFile::binary("blob.bin", vec![0xff, 0x00]);
        assert_eq!(input.contents.as_bytes(), &[0xff, 0x00]);
    }
}
