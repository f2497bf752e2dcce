//! Per-call extraction workspace.
//!
//! Each verification extracts into its own directory under a configured
//! root. Directory names carry a random suffix, so concurrent verifications
//! never share a workspace. The directory is removed by [`release`], which
//! reports failures; dropping an unreleased workspace still removes it on a
//! best-effort basis.
//!
//! [`release`]: ExtractionWorkspace::release

use log::debug;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix for workspace directory names.
const WORKSPACE_PREFIX: &str = "parcel-";

/// Failure to delete a workspace.
#[derive(Debug, thiserror::Error)]
#[error("failed to delete temporary files in {}: {source}", .path.display())]
pub struct WorkspaceError {
    /// The workspace directory that could not be removed.
    pub path: PathBuf,
    /// The underlying I/O error.
    #[source]
    pub source: io::Error,
}

/// A uniquely named directory owning all files extracted by one call.
#[derive(Debug)]
pub struct ExtractionWorkspace {
    dir: TempDir,
}

impl ExtractionWorkspace {
    /// Create a new workspace under `root`, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `root` or the workspace cannot be created.
    pub fn create(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)?;
        debug!("created extraction workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// The workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the workspace.
    #[must_use]
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Delete the workspace and everything in it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the directory cannot be removed.
    pub fn release(self) -> Result<(), WorkspaceError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|source| WorkspaceError {
            path: path.clone(),
            source,
        })?;
        debug!("deleted extraction workspace {}", path.display());
        Ok(())
    }
}
