//! Deobfuscation Stages: one [`Stage`] per external tool.
//!
//! # Pipeline Flow
//!
//! ```text
//! input.dll → de4dot → eazdevirt → EazFixer → osu!decoder → [ilspycmd]
//!               ↓          ↓           ↓            ↓             ↓
//!           -cleaned  -devirtualized -eazfix    -decrypted      decomp/
//! ```
//!
//! Each stage runs the build artifact of its tool through the shared
//! [`CommandExecutor`], so the whole chain can be driven by a fake executor.

mod de4dot;
mod eazdevirt;
mod eazfixer;
mod ilspy;
mod osu_decoder;

pub use de4dot::CleanStage;
pub use eazdevirt::{DevirtReport, DevirtualizeStage, FATAL_SIGNATURES};
pub use eazfixer::FixStage;
pub use ilspy::{DecompileStage, DECOMPILE_DIR};
pub use osu_decoder::DecodeStage;

use std::sync::Arc;

use deob_core::{run_checked, CommandExecutor, CommandOutput, DeobError, ShellCommand, StageChain};
use deob_toolchain::{ToolHandle, ToolRole, Toolchain};

/// A tool's build artifact plus the executor that runs it
#[derive(Clone)]
pub struct ToolInvoker {
    handle: Arc<ToolHandle>,
    executor: Arc<dyn CommandExecutor>,
}

impl ToolInvoker {
    pub fn new(handle: Arc<ToolHandle>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { handle, executor }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Command line for the tool's artifact; arguments are added by the stage
    pub fn command(&self) -> ShellCommand {
        ShellCommand::new(self.handle.artifact_path().to_string_lossy())
    }

    /// Runs to completion; a non-zero exit is a [`DeobError::ProcessFailed`]
    pub async fn run(&self, cmd: ShellCommand) -> Result<CommandOutput, DeobError> {
        if !self.handle.is_present().await {
            tracing::warn!(
                artifact = %self.handle.artifact_path().display(),
                "build artifact missing"
            );
        }
        run_checked(self.executor.as_ref(), &cmd).await
    }
}

/// Wires every role of the toolchain into a pipeline stage chain
pub fn stage_chain(toolchain: &Toolchain, executor: Arc<dyn CommandExecutor>) -> StageChain {
    let invoker = |role| ToolInvoker::new(toolchain.handle(role), executor.clone());

    StageChain {
        clean: Arc::new(CleanStage::new(invoker(ToolRole::Clean))),
        devirtualize: Arc::new(DevirtualizeStage::new(invoker(ToolRole::Devirtualize))),
        devirtualize_fallback: Arc::new(DevirtualizeStage::new(invoker(
            ToolRole::DevirtualizeFallback,
        ))),
        fix: Arc::new(FixStage::new(invoker(ToolRole::Fix))),
        decode: Arc::new(DecodeStage::new(invoker(ToolRole::Decode))),
        decompile: Arc::new(DecompileStage::new(invoker(ToolRole::Decompile))),
    }
}

/// Logs whatever a tool printed, at debug level
fn log_stdout(output: &CommandOutput) {
    if !output.stdout.is_empty() {
        tracing::debug!("{}", output.stdout);
    }
}
