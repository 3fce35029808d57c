//! Pipeline Runner: chains the stages of one job inside its working area
use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use crate::context::JobContext;
use crate::data_model::{JobOutcome, PipelineJob, StageResult};
use crate::error::DeobError;
use crate::gate::ReadinessGate;
use crate::stage::{execute_stage, Stage};
use crate::workspace::{copy_dir_all, WorkingArea};

/// The tools of one pipeline, by role
#[derive(Clone)]
pub struct StageChain {
    pub clean: Arc<dyn Stage>,
    pub devirtualize: Arc<dyn Stage>,
    /// Older devirtualizer, only tried when `devirtualize` hits a known crash
    pub devirtualize_fallback: Arc<dyn Stage>,
    pub fix: Arc<dyn Stage>,
    pub decode: Arc<dyn Stage>,
    pub decompile: Arc<dyn Stage>,
}

pub struct Pipeline {
    gate: Arc<dyn ReadinessGate>,
    stages: StageChain,
    pipeline_id: String,
}

impl Pipeline {
    pub fn new(gate: Arc<dyn ReadinessGate>, stages: StageChain) -> Self {
        let pipeline_id = [
            stages.clean.id(),
            stages.devirtualize.id(),
            stages.fix.id(),
            stages.decode.id(),
        ]
        .join("→");

        Self {
            gate,
            stages,
            pipeline_id,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    /// Runs the job and reports whether devirtualization was complete
    pub async fn run(&self, job: &PipelineJob) -> bool {
        self.run_job(job).await.success
    }

    /// Runs the job end to end. Never fails: every error is logged and turned
    /// into an unsuccessful outcome so sibling jobs are unaffected.
    pub async fn run_job(&self, job: &PipelineJob) -> JobOutcome {
        let ctx = JobContext::new(job);
        let span = tracing::info_span!(
            "job",
            name = %ctx.name,
            pipeline = %self.pipeline_id,
            trace_id = %ctx.trace_id
        );

        async {
            match self.try_run(job, &ctx).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    if err.is_soft() {
                        tracing::error!("{err}");
                    } else if let DeobError::ProcessFailed { .. } = err {
                        tracing::error!(critical = true, "{err}");
                    } else {
                        tracing::error!("job aborted: {err}");
                    }
                    JobOutcome::failed()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_run(&self, job: &PipelineJob, ctx: &JobContext) -> Result<JobOutcome, DeobError> {
        self.gate.ensure()?;
        check_inputs(job).await?;

        let area = WorkingArea::prepare(ctx.working_dir.clone(), &job.dependencies, &job.input).await?;
        let outcome = self.run_stages(job, ctx).await;
        area.close().await;

        outcome
    }

    async fn run_stages(&self, job: &PipelineJob, ctx: &JobContext) -> Result<JobOutcome, DeobError> {
        let cleaned = execute_stage(self.stages.clean.as_ref(), ctx, &job.file_name()).await?;
        let (devirtualized, used_fallback) = self.devirtualize(ctx, &cleaned.output).await?;

        let fixed = execute_stage(self.stages.fix.as_ref(), ctx, &devirtualized.output).await?;
        let decoded = execute_stage(self.stages.decode.as_ref(), ctx, &fixed.output).await?;

        let decompiled = if job.flags.decompile {
            Some(execute_stage(self.stages.decompile.as_ref(), ctx, &decoded.output).await?)
        } else {
            None
        };

        let published = if job.flags.dry_run {
            tracing::info!("dry run, nothing published");
            None
        } else {
            Some(publish(job, ctx, &decoded, decompiled.as_ref()).await?)
        };

        Ok(JobOutcome {
            success: devirtualized.succeeded,
            published,
            used_fallback,
        })
    }

    /// The pipeline's only branch: a recoverable failure of the primary
    /// devirtualizer is retried once through the fallback tool.
    async fn devirtualize(
        &self,
        ctx: &JobContext,
        input: &str,
    ) -> Result<(StageResult, bool), DeobError> {
        match execute_stage(self.stages.devirtualize.as_ref(), ctx, input).await {
            Ok(result) => Ok((result, false)),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(
                    fallback = self.stages.devirtualize_fallback.tool(),
                    "{err}, retrying with fallback"
                );
                let result =
                    execute_stage(self.stages.devirtualize_fallback.as_ref(), ctx, input).await?;
                Ok((result, true))
            }
            Err(err) => Err(err),
        }
    }
}

async fn check_inputs(job: &PipelineJob) -> Result<(), DeobError> {
    if !tokio::fs::metadata(&job.input)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        return Err(DeobError::InputMissing(job.input.clone()));
    }

    for dependency in &job.dependencies {
        if !tokio::fs::metadata(dependency)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(DeobError::DependencyMissing(dependency.clone()));
        }
    }

    Ok(())
}

async fn publish(
    job: &PipelineJob,
    ctx: &JobContext,
    binary: &StageResult,
    project: Option<&StageResult>,
) -> Result<PathBuf, DeobError> {
    match project {
        Some(project) => {
            let target = job.published_project();
            copy_dir_all(&ctx.path(&project.output), &target).await?;
            tracing::info!(path = %target.display(), "published project");
            Ok(target)
        }
        None => {
            let target = job.published_binary();
            tokio::fs::copy(ctx.path(&binary.output), &target)
                .await
                .map_err(|e| DeobError::io(format!("publishing {}", target.display()), e))?;
            tracing::info!(path = %target.display(), "published assembly");
            Ok(target)
        }
    }
}
