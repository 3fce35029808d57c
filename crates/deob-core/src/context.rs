//! Execution Context: per-job state handed to every stage
use std::path::{Path, PathBuf};

use crate::data_model::PipelineJob;

#[derive(Debug, Clone)]
pub struct JobContext {
    /// Input stem, used to scope logs
    pub name: String,
    pub working_dir: PathBuf,
    pub password: String,
    pub trace_id: String,
}

impl JobContext {
    pub fn new(job: &PipelineJob) -> Self {
        Self {
            name: job.stem(),
            working_dir: job.working_dir(),
            password: job.password.clone(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Resolves a name relative to the working area
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.working_dir.join(relative)
    }
}
