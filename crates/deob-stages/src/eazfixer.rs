use std::path::Path;

use async_trait::async_trait;
use deob_core::{DeobError, JobContext, Stage, StageResult};

use crate::{log_stdout, ToolInvoker};

/// Removes the remaining Eazfuscator protections (strings, resources, proxies)
pub struct FixStage {
    tool: ToolInvoker,
}

impl FixStage {
    pub fn new(tool: ToolInvoker) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl Stage for FixStage {
    fn id(&self) -> &'static str {
        "fix"
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
        let cmd = self.tool.command().arg("--file").arg(input.to_string_lossy());
        let output = self.tool.run(cmd).await?;
        log_stdout(&output);

        tracing::info!("Deobfuscated assembly.");
        Ok(StageResult::ok(format!("{stem}-eazfix.dll")))
    }
}
