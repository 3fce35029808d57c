use std::path::Path;

use async_trait::async_trait;
use deob_core::{DeobError, JobContext, Stage, StageResult};

use crate::{log_stdout, ToolInvoker};

/// Project directory, relative to the working area
pub const DECOMPILE_DIR: &str = "decomp";

/// Decompiles the final assembly into a C# project
pub struct DecompileStage {
    tool: ToolInvoker,
}

impl DecompileStage {
    pub fn new(tool: ToolInvoker) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl Stage for DecompileStage {
    fn id(&self) -> &'static str {
        "decompile"
    }

    fn tool(&self) -> &str {
        self.tool.name()
    }

    async fn invoke(
        &self,
        ctx: &JobContext,
        input: &Path,
        _stem: &str,
    ) -> Result<StageResult, DeobError> {
        let output_dir = ctx.path(DECOMPILE_DIR);
        if tokio::fs::try_exists(&output_dir).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&output_dir)
                .await
                .map_err(|e| DeobError::io(format!("clearing {}", output_dir.display()), e))?;
        }
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| DeobError::io(format!("creating {}", output_dir.display()), e))?;

        let cmd = self
            .tool
            .command()
            .args(["--project", "--outputdir"])
            .arg(output_dir.to_string_lossy())
            .arg(input.to_string_lossy());
        let output = self.tool.run(cmd).await?;
        log_stdout(&output);

        tracing::info!("Decompiled assembly.");
        Ok(StageResult::ok(DECOMPILE_DIR))
    }
}
