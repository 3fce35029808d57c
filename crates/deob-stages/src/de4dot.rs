use std::path::Path;

use async_trait::async_trait;
use deob_core::{DeobError, JobContext, Stage, StageResult};

use crate::{log_stdout, ToolInvoker};

/// Strips control-flow obfuscation while keeping names, types and tokens
pub struct CleanStage {
    tool: ToolInvoker,
}

impl CleanStage {
    pub fn new(tool: ToolInvoker) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl Stage for CleanStage {
    fn id(&self) -> &'static str {
        "clean"
    }

    fn tool(&self) -> &str {
        self.tool.name()
    }

    async fn invoke(
        &self,
        _ctx: &JobContext,
        input: &Path,
        stem: &str,
    ) -> Result<StageResult, DeobError> {
        let cmd = self
            .tool
            .command()
            .args(["--dont-rename", "--keep-types", "--preserve-tokens"])
            .arg(input.to_string_lossy());
        let output = self.tool.run(cmd).await?;
        log_stdout(&output);

        tracing::info!("Cleaned assembly.");
        Ok(StageResult::ok(format!("{stem}-cleaned.dll")))
    }
}
