//! Stage Trait: one contract for every external tool
use std::path::Path;

use async_trait::async_trait;
use tracing::Instrument;

use crate::context::JobContext;
use crate::data_model::StageResult;
use crate::error::DeobError;

/// Contract of a pipeline stage
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage role (ex: "clean", "devirtualize")
    fn id(&self) -> &'static str;

    /// Name of the tool doing the work, for logs
    fn tool(&self) -> &str;

    /// Runs the tool against `input` (absolute, inside the working area).
    ///
    /// `stem` is the input file name without extension; stages derive their
    /// output name from it. The returned output is validated by
    /// [`execute_stage`], not by the implementation.
    async fn invoke(
        &self,
        ctx: &JobContext,
        input: &Path,
        stem: &str,
    ) -> Result<StageResult, DeobError>;
}

/// Runs one stage on a file of the working area and checks that the declared
/// output exists afterwards.
pub async fn execute_stage(
    stage: &dyn Stage,
    ctx: &JobContext,
    input_file: &str,
) -> Result<StageResult, DeobError> {
    let span = tracing::info_span!("stage", id = stage.id(), tool = stage.tool());

    async move {
        let input = ctx.path(input_file);
        let stem = Path::new(input_file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| input_file.to_string());

        tracing::debug!(input = input_file, "running");
        let result = stage.invoke(ctx, &input, &stem).await?;

        let output = ctx.path(&result.output);
        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            tracing::error!(output = %result.output, "Failed, aborting...");
            return Err(DeobError::OutputMissing(output));
        }

        Ok(result)
    }
    .instrument(span)
    .await
}
