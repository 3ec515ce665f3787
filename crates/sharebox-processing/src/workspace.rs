//! Scratch space for the pipeline.
//!
//! Every transcode runs in its own directory under the configured workspace
//! root. The directory is removed on every exit path: explicitly through
//! [`ScopedWorkspace::release`], or by `Drop` when the pipeline future is
//! dropped or panics.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create `path` (and parents) if missing and return its absolute form.
pub async fn ensure_dir(path: &Path) -> io::Result<PathBuf> {
    match tokio::fs::create_dir_all(path).await {
        Ok(()) => {}
        Err(e) if tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) => {
            tracing::debug!(path = %path.display(), error = %e, "Directory already present");
        }
        Err(e) => return Err(e),
    }
    tokio::fs::canonicalize(path).await
}

/// Remove a directory tree. Failures are logged, never returned.
pub async fn remove_tree(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove directory"),
    }
}

/// A per-call workspace directory.
#[derive(Debug)]
pub struct ScopedWorkspace {
    dir: TempDir,
}

impl ScopedWorkspace {
    /// Allocate a fresh `upload-*` directory under `root`.
    pub async fn acquire(root: &Path) -> io::Result<Self> {
        let root = ensure_dir(root).await?;
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix("upload-").tempdir_in(root)
        })
        .await
        .map_err(io::Error::other)??;

        tracing::debug!(path = %dir.path().display(), "Workspace acquired");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the workspace now, logging any failure.
    pub async fn release(self) {
        remove_tree(self.dir.path()).await;
        // TempDir's own drop finds nothing left to remove.
    }
}

/// An input file the pipeline owns and must delete exactly once.
#[derive(Debug)]
pub struct OwnedBuffer {
    path: Option<PathBuf>,
}

impl OwnedBuffer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A guard that owns nothing.
    pub fn none() -> Self {
        Self { path: None }
    }

    /// Give up ownership without deleting; the caller becomes responsible for the file.
    pub fn keep(mut self) -> Option<PathBuf> {
        self.path.take()
    }

    pub async fn discard(mut self) {
        if let Some(path) = self.path.take() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed upload buffer"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload buffer"),
            }
        }
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload buffer");
                }
            }
        }
    }
}
