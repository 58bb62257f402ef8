//! The scoped tool invocation pipeline.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, info, info_span};

use crate::error::ExecResult;
use crate::harvest::harvest;
use crate::invoke::run_process;
use crate::materialize::materialize;
use crate::types::{InvocationRequest, InvocationResult, InvocationStatus};
use crate::workspace::Workspace;

/// Default limit on a single tool run (60 seconds).
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs tool invocations, each in its own workspace under `scratch_root`.
///
/// Holds no mutable state; clones share nothing but configuration.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    scratch_root: PathBuf,
    default_timeout: Duration,
}

impl ToolRunner {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            default_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run one invocation end to end.
    ///
    /// The workspace is released before this returns, on success and on
    /// every error. A nonzero exit code or a timeout is a successful
    /// invocation; errors are reserved for failures before or while
    /// starting the tool.
    pub async fn run(&self, request: InvocationRequest) -> ExecResult<InvocationResult> {
        let span = info_span!("invocation", tool = %request.tool_name());
        async move {
            let workspace = Workspace::create(
                self.scratch_root.clone(),
                request.workspace_prefix.clone(),
            )
            .await?;
            let result = self.run_in(&workspace, &request).await;
            workspace.discard().await;
            result
        }
        .instrument(span)
        .await
    }

    async fn run_in(
        &self,
        workspace: &Workspace,
        request: &InvocationRequest,
    ) -> ExecResult<InvocationResult> {
        let started = Instant::now();

        materialize(workspace, &request.inputs).await?;
        debug!(
            workspace = %workspace.path().display(),
            inputs = request.inputs.len(),
            "Inputs written"
        );

        let limit = request.timeout.unwrap_or(self.default_timeout);
        let output = run_process(
            &request.program,
            &request.args,
            workspace.path(),
            &request.env,
            limit,
        )
        .await?;
        debug!(exit_code = output.exit_code, "Tool finished");

        let outputs = harvest(workspace, &request.outputs, &request.inputs).await;

        let status = if output.timed_out {
            InvocationStatus::TimedOut
        } else {
            InvocationStatus::Completed
        };

        info!(
            exit_code = output.exit_code,
            timed_out = output.timed_out,
            outputs = outputs.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Invocation completed"
        );

        Ok(InvocationResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            outputs,
            status,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use crate::types::{InputFile, NamedOutput, OutputSpec};

    fn sh_request(script: &str) -> InvocationRequest {
        InvocationRequest::new("/bin/sh").args(["-c", script])
    }

    fn leftover(root: &Path) -> usize {
        std::fs::read_dir(root).unwrap().count()
    }

    #[tokio::test]
    async fn test_named_outputs_and_streams() {
        let root = tempfile::tempdir().unwrap();
        let runner = ToolRunner::new(root.path());
        let request = sh_request(
            "test -f plc.xml || exit 9; printf OK > program.st; echo generated; echo warning >&2",
        )
        .workspace_prefix("xml2st_")
        .input(InputFile::text("plc.xml", "<project/>"))
        .outputs(OutputSpec::named([NamedOutput::new("program_st", "program.st")]));

        let result = runner.run(request).await.unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output("program_st"), Some("OK"));
        assert_eq!(result.stdout, "generated\n");
        assert_eq!(result.stderr, "warning\n");
        assert_eq!(result.status, InvocationStatus::Completed);
        assert_eq!(leftover(root.path()), 0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_still_harvests_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let runner = ToolRunner::new(root.path());
        let request = sh_request("printf partial > debug.c; echo 'syntax error' >&2; exit 2")
            .outputs(OutputSpec::named([
                NamedOutput::new("debug_c", "debug.c"),
                NamedOutput::new("program_st", "program.st"),
            ]));

        let result = runner.run(request).await.unwrap();

        assert_eq!(result.exit_code, 2);
        assert!(!result.success());
        assert_eq!(result.output("debug_c"), Some("partial"));
        assert_eq!(result.output("program_st"), None);
        assert_eq!(result.stderr, "syntax error\n");
        assert_eq!(leftover(root.path()), 0);
    }

    #[tokio::test]
    async fn test_enumerate_excludes_rewritten_inputs() {
        let root = tempfile::tempdir().unwrap();
        let runner = ToolRunner::new(root.path());
        let request =
            sh_request("printf c > POUS.c; printf h > POUS.h; printf changed > program.st")
                .input(InputFile::text("program.st", "PROGRAM main"))
                .outputs(OutputSpec::enumerate());

        let result = runner.run(request).await.unwrap();

        assert_eq!(
            result.outputs.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["POUS.c", "POUS.h"]
        );
        assert_eq!(leftover(root.path()), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_reported_and_cleaned_up() {
        let root = tempfile::tempdir().unwrap();
        let runner = ToolRunner::new(root.path()).with_timeout(Duration::from_millis(300));
        let request = sh_request("printf early > program.st; exec sleep 30")
            .outputs(OutputSpec::named([NamedOutput::new("program_st", "program.st")]));

        let result = runner.run(request).await.unwrap();

        assert!(result.timed_out());
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.output("program_st"), Some("early"));
        assert_eq!(leftover(root.path()), 0);
    }

    #[tokio::test]
    async fn test_request_timeout_overrides_default() {
        let root = tempfile::tempdir().unwrap();
        let runner = ToolRunner::new(root.path());
        let request = sh_request("exec sleep 30").timeout(Duration::from_millis(200));

        let result = runner.run(request).await.unwrap();
        assert!(result.timed_out());
    }

    #[tokio::test]
    async fn test_invalid_input_name_never_runs_tool() {
        let root = tempfile::tempdir().unwrap();
        let marker = root.path().join("ran");
        let runner = ToolRunner::new(root.path().join("scratch"));
        let request = sh_request(&format!("touch {}", marker.display()))
            .input(InputFile::text("../escape.st", "PROGRAM main"));

        let err = runner.run(request).await.unwrap_err();

        assert!(matches!(err, ExecError::InvalidFileName { .. }));
        assert!(!marker.exists());
        assert!(!root.path().join("escape.st").exists());
        assert_eq!(leftover(&root.path().join("scratch")), 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let runner = ToolRunner::new(root.path());
        let request = InvocationRequest::new("/nonexistent/iec2c")
            .input(InputFile::text("program.st", "PROGRAM main"));

        let err = runner.run(request).await.unwrap_err();

        assert!(matches!(err, ExecError::Spawn { .. }));
        assert_eq!(leftover(root.path()), 0);
    }

    #[tokio::test]
    async fn test_cancelled_invocation_releases_workspace() {
        let root = tempfile::tempdir().unwrap();
        let runner = ToolRunner::new(root.path());
        let request = sh_request("exec sleep 30");

        let cancelled =
            tokio::time::timeout(Duration::from_millis(300), runner.run(request)).await;

        assert!(cancelled.is_err());
        assert_eq!(leftover(root.path()), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invocations_use_distinct_workspaces() {
        let root = tempfile::tempdir().unwrap();
        let runner = ToolRunner::new(root.path());
        let script = "pwd; cat program.st > copy.st; sleep 0.2";

        let runs = (0..4).map(|_| {
            let runner = runner.clone();
            let request = sh_request(script)
                .input(InputFile::text("program.st", "PROGRAM same END_PROGRAM"))
                .outputs(OutputSpec::enumerate());
            tokio::spawn(async move { runner.run(request).await.unwrap() })
        });

        let mut dirs = std::collections::BTreeSet::new();
        for run in runs.collect::<Vec<_>>() {
            let result = run.await.unwrap();
            assert_eq!(result.output("copy.st"), Some("PROGRAM same END_PROGRAM"));
            assert_eq!(result.outputs.len(), 1);
            dirs.insert(result.stdout);
        }

        assert_eq!(dirs.len(), 4);
        assert_eq!(leftover(root.path()), 0);
    }
}
