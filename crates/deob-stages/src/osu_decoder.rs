use std::path::Path;

use async_trait::async_trait;
use deob_core::{DeobError, JobContext, Stage, StageResult};

use crate::{log_stdout, ToolInvoker};

/// Decrypts symbol names with the job's password
pub struct DecodeStage {
    tool: ToolInvoker,
}

impl DecodeStage {
    pub fn new(tool: ToolInvoker) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl Stage for DecodeStage {
    fn id(&self) -> &'static str {
        "decode"
    }

    fn tool(&self) -> &str {
        self.tool.name()
    }

    async fn invoke(
        &self,
        ctx: &JobContext,
        input: &Path,
        stem: &str,
    ) -> Result<StageResult, DeobError> {
        let cmd = self
            .tool
            .command()
            .arg("-i")
            .arg(input.to_string_lossy())
            .arg("-p")
            .secret_arg(ctx.password.as_str());
        let output = self.tool.run(cmd).await?;
        log_stdout(&output);

        tracing::info!("Decoded encrypted symbols.");
        Ok(StageResult::ok(format!("{stem}-decrypted.dll")))
    }
}
