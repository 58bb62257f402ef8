//! Per-invocation scratch directories.
//!
//! A [`Workspace`] is created fresh for one invocation and removed when the
//! invocation ends. Removal happens in [`Workspace::release`] on the normal
//! path and in `Drop` on every other path: early returns, a cancelled
//! request future, or a panic that unwinds. A release build that aborts on
//! panic skips `Drop`, so the release profile keeps unwinding.
//!
//! Creation and removal touch the filesystem synchronously; async callers
//! use [`Workspace::create`] and [`Workspace::discard`], which run them on
//! the blocking thread pool.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{ExecError, ExecResult};

/// An exclusively owned scratch directory.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Create a new, uniquely named directory under `root`.
    ///
    /// The name is `prefix` followed by a random suffix. An existing
    /// directory is never reused. `root` is created if missing.
    pub fn acquire(root: &Path, prefix: &str) -> ExecResult<Self> {
        let create_error = |source| ExecError::CreateWorkspace {
            root: root.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(root).map_err(create_error)?;
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(root)
            .map_err(create_error)?;

        let path = dir.path().to_path_buf();
        debug!(workspace = %path.display(), "Workspace acquired");

        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    /// [`Workspace::acquire`] on the blocking thread pool.
    pub async fn create(root: PathBuf, prefix: String) -> ExecResult<Self> {
        tokio::task::spawn_blocking(move || Self::acquire(&root, &prefix)).await?
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `file_name` inside the workspace.
    pub fn join(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    /// Remove the directory and everything in it.
    ///
    /// Failures are logged and swallowed.
    pub fn release(mut self) {
        if let Some(dir) = self.dir.take() {
            remove(dir);
        }
    }

    /// [`Workspace::release`] on the blocking thread pool.
    ///
    /// Removal continues even if the caller is cancelled while waiting.
    pub async fn discard(self) {
        let path = self.path.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || self.release()).await {
            warn!(workspace = %path.display(), error = %e, "Workspace removal task failed");
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            debug!(workspace = %self.path.display(), "Releasing workspace on drop");
            remove(dir);
        }
    }
}

fn remove(dir: TempDir) {
    let path = dir.path().to_path_buf();
    match dir.close() {
        Ok(()) => debug!(workspace = %path.display(), "Workspace released"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(workspace = %path.display(), "Workspace already removed");
        }
        Err(e) => warn!(
            workspace = %path.display(),
            error = %e,
            "Failed to remove workspace"
        ),
    }
}
