//! Runtime handle of one checked-out tool
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::manifest::ToolSpec;

#[derive(Debug, Clone)]
pub struct ToolHandle {
    spec: ToolSpec,
    checkout: PathBuf,
}

impl ToolHandle {
    pub fn new(spec: ToolSpec, tools_dir: &Path) -> Self {
        let checkout = tools_dir.join(&spec.name);
        Self { spec, checkout }
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn checkout_dir(&self) -> &Path {
        &self.checkout
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.checkout.join(&self.spec.artifact)
    }

    pub fn solution_path(&self) -> PathBuf {
        self.checkout.join(format!("{}.sln", self.spec.solution))
    }

    /// Whether the build artifact exists. Re-checked on every call.
    pub async fn is_present(&self) -> bool {
        fs::metadata(self.artifact_path())
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// A checkout is empty when missing or without any top-level file
    pub async fn is_empty(&self) -> bool {
        let Ok(mut entries) = fs::read_dir(&self.checkout).await else {
            return true;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                return false;
            }
        }
        true
    }
}
