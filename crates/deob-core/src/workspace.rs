//! Working area: an isolated directory per job, removed exactly once
use std::path::{Path, PathBuf};

use tokio::fs;
use walkdir::WalkDir;

use crate::error::DeobError;

/// Job-exclusive directory holding the staged input and every stage output.
///
/// The directory is removed by [`WorkingArea::close`] on the normal path and
/// by `Drop` when the owning future is dropped or unwinds.
#[derive(Debug)]
pub struct WorkingArea {
    root: PathBuf,
    removed: bool,
}

impl WorkingArea {
    /// Creates a fresh area at `root` (replacing any stale leftover), merges
    /// every dependency directory into it and copies `input` in.
    pub async fn prepare(
        root: PathBuf,
        dependencies: &[PathBuf],
        input: &Path,
    ) -> Result<Self, DeobError> {
        if fs::try_exists(&root).await.unwrap_or(false) {
            tracing::debug!(path = %root.display(), "removing stale working area");
            fs::remove_dir_all(&root)
                .await
                .map_err(|e| DeobError::io(format!("removing {}", root.display()), e))?;
        }

        fs::create_dir_all(&root)
            .await
            .map_err(|e| DeobError::io(format!("creating {}", root.display()), e))?;

        let area = Self {
            root,
            removed: false,
        };

        for dependency in dependencies {
            copy_dir_all(dependency, &area.root).await?;
        }

        let file_name = input
            .file_name()
            .ok_or_else(|| DeobError::InputMissing(input.to_path_buf()))?;
        let staged = area.root.join(file_name);
        fs::copy(input, &staged)
            .await
            .map_err(|e| DeobError::io(format!("staging {}", input.display()), e))?;

        tracing::debug!(path = %area.root.display(), "working area ready");
        Ok(area)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Removes the area. Errors are logged, never returned.
    pub async fn close(mut self) {
        self.removed = true;
        if let Err(err) = fs::remove_dir_all(&self.root).await {
            tracing::warn!(path = %self.root.display(), "failed to remove working area: {err}");
        }
    }
}

impl Drop for WorkingArea {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if let Err(err) = std::fs::remove_dir_all(&self.root) {
            tracing::warn!(path = %self.root.display(), "failed to remove working area: {err}");
        }
    }
}

/// Recursively copies the contents of `src` into `dst`, overwriting files
pub async fn copy_dir_all(src: &Path, dst: &Path) -> Result<(), DeobError> {
    let src = src.to_path_buf();
    let dst = dst.to_path_buf();

    tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
        .await
        .map_err(|e| DeobError::io("copy task", std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

fn copy_tree(src: &Path, dst: &Path) -> Result<(), DeobError> {
    let context = || format!("copying {} to {}", src.display(), dst.display());

    std::fs::create_dir_all(dst).map_err(|e| DeobError::io(context(), e))?;

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| DeobError::io(context(), e.into()))?;
        let rel = match entry.path().strip_prefix(src) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };

        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| DeobError::io(context(), e))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| DeobError::io(context(), e))?;
        }
    }

    Ok(())
}
