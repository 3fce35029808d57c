//! Unified Error Model
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeobError {
    #[error("SETUP/REQUIRED: toolchain setup has not completed")]
    SetupRequired,

    #[error("INPUT/MISSING: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("DEPENDENCY/MISSING: {}", .0.display())]
    DependencyMissing(PathBuf),

    #[error("{}", render_process_failure(.command, .stdout, .stderr))]
    ProcessFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("STAGE/{stage}: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("OUTPUT/MISSING: {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("TIMEOUT/{command}: exceeded {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("IO/{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DeobError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Failures that only cost the current job and never need a critical log
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::OutputMissing(_))
    }

    /// Failures the devirtualization step may answer with its fallback tool
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StageFailed { .. })
    }
}

fn render_process_failure(command: &str, stdout: &str, stderr: &str) -> String {
    let mut message = format!("Error while running command: {command}\n");

    if !stdout.is_empty() {
        message.push_str(&format!("\nstdout:\n{stdout}\n"));
    }

    if !stderr.is_empty() {
        message.push_str(&format!("\nstderr:\n{stderr}\n"));
    }

    message
}
