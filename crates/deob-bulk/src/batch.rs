//! Batch runner: bounded-concurrency pipeline runs with per-job isolation
use std::sync::Arc;

use deob_core::{JobStatus, Pipeline, PipelineJob};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::BatchConfig;
use crate::report::BatchReport;
use crate::versions::VersionEntry;

/// One entry of a batch; `job` is `None` when the input could not be resolved
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub key: String,
    pub job: Option<PipelineJob>,
}

impl BatchJob {
    pub fn from_entry(entry: &VersionEntry, config: &BatchConfig) -> Self {
        let job = entry.filepath.as_ref().map(|path| {
            PipelineJob::new(path.clone(), config.password.clone())
                .with_dependencies(entry.dependencies.clone())
                .with_flags(config.flags)
        });

        Self {
            key: entry.version.clone(),
            job,
        }
    }

    /// Builds the batch for `entries`, honouring the single-version filter
    pub fn plan(entries: &[VersionEntry], config: &BatchConfig) -> Vec<Self> {
        entries
            .iter()
            .filter(|entry| {
                config
                    .only_version
                    .as_deref()
                    .map_or(true, |only| entry.version == only)
            })
            .map(|entry| Self::from_entry(entry, config))
            .collect()
    }
}

pub struct BatchRunner {
    pipeline: Arc<Pipeline>,
    parallelism: usize,
}

impl BatchRunner {
    pub fn new(pipeline: Arc<Pipeline>, parallelism: usize) -> Self {
        Self {
            pipeline,
            parallelism: parallelism.max(1),
        }
    }

    /// Runs every resolvable job, at most `parallelism` at a time. Unresolved
    /// jobs are skipped with a warning; a job that panics counts as failed.
    pub async fn run(&self, jobs: Vec<BatchJob>) -> Arc<BatchReport> {
        let report = Arc::new(BatchReport::new());
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks = JoinSet::new();

        for BatchJob { key, job } in jobs {
            let Some(job) = job else {
                tracing::warn!("{key} does not exist!");
                report.skip();
                continue;
            };

            let semaphore = semaphore.clone();
            let pipeline = self.pipeline.clone();
            let report = report.clone();

            tasks.spawn(async move {
                // The semaphore is never closed
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let run = tokio::spawn(async move { pipeline.run(&job).await });
                let success = match run.await {
                    Ok(success) => success,
                    Err(err) => {
                        tracing::error!("{key} crashed: {err}");
                        false
                    }
                };

                report.record(key, JobStatus::from(success));
            });
        }

        while tasks.join_next().await.is_some() {}

        report
    }
}
