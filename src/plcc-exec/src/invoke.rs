//! Running the external tool.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ExecError, ExecResult};

/// Exit code reported for a tool killed on timeout.
pub(crate) const TIMEOUT_EXIT_CODE: i32 = -1;

/// How long to wait for the output pipes to close after killing a tool.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Captured result of a single process run.
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

/// Run `program` in `cwd` and capture its output streams and exit code.
///
/// The child starts from an empty environment: only `PATH`, `HOME` (set to
/// the workspace), `LANG` and the explicit `env` pairs are passed. The exit
/// code is reported as-is.
///
/// `limit` bounds the whole run, including reading the output pipes to
/// EOF. The tool gets its own process group and the group is killed when
/// this returns or is dropped, so nothing the tool started outlives it.
pub(crate) async fn run_process(
    program: &Path,
    args: &[String],
    cwd: &Path,
    env: &[(String, String)],
    limit: Duration,
) -> ExecResult<ProcessOutput> {
    let program_name = program.display().to_string();
    let deadline = Instant::now() + limit;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    cmd.env_clear();
    cmd.env(
        "PATH",
        std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string()),
    );
    cmd.env("HOME", cwd);
    cmd.env("LANG", "C.UTF-8");
    cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: program_name.clone(),
        source,
    })?;
    let mut group = ProcessGroup::of(&child);
    debug!(program = %program_name, pid = ?child.id(), "Tool started");

    let mut stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let mut stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let finished = tokio::time::timeout_at(deadline, async {
        let status = child.wait().await;
        let stdout = (&mut stdout_task).await.unwrap_or_default();
        let stderr = (&mut stderr_task).await.unwrap_or_default();
        (status, stdout, stderr)
    })
    .await;

    if let Ok((status, stdout, stderr)) = finished {
        let status = status.map_err(|source| ExecError::Wait {
            program: program_name.clone(),
            source,
        })?;
        return Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: exit_code(status),
            timed_out: false,
        });
    }

    warn!(
        program = %program_name,
        timeout_secs = limit.as_secs_f64(),
        "Tool timed out, killing it"
    );
    group.kill();
    if let Err(e) = child.start_kill() {
        debug!(program = %program_name, error = %e, "Tool already exited");
    }
    if tokio::time::timeout(DRAIN_TIMEOUT, child.wait()).await.is_err() {
        warn!(program = %program_name, "Killed tool did not exit");
    }

    Ok(ProcessOutput {
        stdout: drain(stdout_task).await,
        stderr: drain(stderr_task).await,
        exit_code: TIMEOUT_EXIT_CODE,
        timed_out: true,
    })
}

/// Kills the tool's process group on drop.
struct ProcessGroup {
    #[cfg(unix)]
    pgid: Option<Pid>,
}

impl ProcessGroup {
    #[cfg(unix)]
    fn of(child: &Child) -> Self {
        Self {
            pgid: child
                .id()
                .and_then(|id| i32::try_from(id).ok())
                .map(Pid::from_raw),
        }
    }

    #[cfg(not(unix))]
    fn of(_child: &Child) -> Self {
        Self {}
    }

    #[cfg(unix)]
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        match killpg(pgid, Signal::SIGKILL) {
            Ok(()) => debug!(pgid = pgid.as_raw(), "Process group killed"),
            Err(Errno::ESRCH) => {}
            Err(e) => warn!(pgid = pgid.as_raw(), error = %e, "Failed to kill process group"),
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!(error = %e, "Output stream closed with error");
        }
    }
    buf
}

/// Output read so far by a pipe reader, once the tool has been killed.
async fn drain(task: JoinHandle<Vec<u8>>) -> String {
    let bytes = match tokio::time::timeout(DRAIN_TIMEOUT, task).await {
        Ok(joined) => joined.unwrap_or_default(),
        Err(_) => {
            debug!("Output stream still open after kill, dropping it");
            Vec::new()
        }
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(TIMEOUT_EXIT_CODE)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(TIMEOUT_EXIT_CODE)
}
