use anyhow::{Context, Result};
use log::{error, info};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary directory holding the generated uploads.
///
/// Removed by [`Workspace::close`] or, failing that, on drop. Removal errors
/// are logged and never returned, so they cannot mask the run's own result.
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("lb-harness-")
            .tempdir()
            .context("Failed to create temporary workload directory")?;
        let path = dir.path().to_path_buf();
        info!("Workload directory: {}", path.display());
        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(dir) = self.dir.take() {
            info!("Cleaning up temporary files...");
            match dir.close() {
                Ok(()) => info!("Removed {}", self.path.display()),
                Err(e) => error!("Failed to remove {}: {}", self.path.display(), e),
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}
