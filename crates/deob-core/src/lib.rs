//! Deobfuscation Core: Stage trait, process port, working area and orchestrator
//!
//! Every external tool is wrapped by a [`Stage`]. The [`Pipeline`] chains the
//! stages against one input inside an isolated [`WorkingArea`] and reduces the
//! run to a single verdict.
//!
//! ```text
//! clean → devirtualize ─┬→ fix → decode → [decompile] → publish
//!                       └ (StageFailed) devirtualize_fallback ┘
//! ```

pub mod context;
pub mod data_model;
pub mod error;
pub mod gate;
pub mod process;
pub mod runner;
pub mod stage;
pub mod workspace;

pub use context::JobContext;
pub use data_model::{JobFlags, JobOutcome, JobStatus, PipelineJob, StageResult};
pub use error::DeobError;
pub use gate::ReadinessGate;
pub use process::{run_checked, CommandExecutor, CommandOutput, ShellCommand, SystemCommandExecutor};
pub use runner::{Pipeline, StageChain};
pub use stage::{execute_stage, Stage};
pub use workspace::{copy_dir_all, WorkingArea};

/// Suffix of the per-job working directory, next to the input artifact
pub const WORKING_DIR_SUFFIX: &str = "-deobfuscation";

/// Suffix of the published artifact or project directory
pub const PUBLISHED_SUFFIX: &str = "-deobfuscated";
