//! Data Model: PipelineJob, StageResult, JobOutcome
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{PUBLISHED_SUFFIX, WORKING_DIR_SUFFIX};

/// One unit of work: a single obfuscated artifact and what it needs
#[derive(Debug, Clone)]
pub struct PipelineJob {
    /// Absolute path of the obfuscated input artifact
    pub input: PathBuf,
    /// Directories merged into the working area before the input is copied in
    pub dependencies: Vec<PathBuf>,
    /// Symbol password handed to the decode stage
    pub password: String,
    pub flags: JobFlags,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobFlags {
    /// Run everything but publish nothing
    pub dry_run: bool,
    /// Publish a decompiled project instead of a binary
    pub decompile: bool,
}

impl PipelineJob {
    pub fn new(input: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            dependencies: Vec::new(),
            password: password.into(),
            flags: JobFlags::default(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<PathBuf>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_flags(mut self, flags: JobFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Input file name without extension
    pub fn stem(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string())
    }

    /// Input file name with extension
    pub fn file_name(&self) -> String {
        self.input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.stem())
    }

    /// Directory holding the input; results are published here
    pub fn destination_dir(&self) -> PathBuf {
        self.input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn working_dir(&self) -> PathBuf {
        self.destination_dir()
            .join(format!("{}{}", self.stem(), WORKING_DIR_SUFFIX))
    }

    /// Published binary, keeps the input's extension
    pub fn published_binary(&self) -> PathBuf {
        let name = match self.input.extension() {
            Some(ext) => format!("{}{}.{}", self.stem(), PUBLISHED_SUFFIX, ext.to_string_lossy()),
            None => format!("{}{}", self.stem(), PUBLISHED_SUFFIX),
        };
        self.destination_dir().join(name)
    }

    pub fn published_project(&self) -> PathBuf {
        self.destination_dir()
            .join(format!("{}{}", self.stem(), PUBLISHED_SUFFIX))
    }
}

/// Output of one stage.
///
/// `succeeded` is the stage's own verdict on the work it did and is distinct
/// from the process exit code: a tool can exit cleanly after handling only
/// part of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    /// File or directory name, relative to the working area
    pub output: String,
    pub succeeded: bool,
    /// Stage-specific findings (e.g. types the tool failed to resolve)
    pub diagnostics: Vec<String>,
}

impl StageResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            succeeded: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn partial(output: impl Into<String>, diagnostics: Vec<String>) -> Self {
        Self {
            output: output.into(),
            succeeded: false,
            diagnostics,
        }
    }
}

/// What a finished job reports back to its caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutcome {
    pub success: bool,
    /// Where the result was copied to, `None` on dry runs and failures
    pub published: Option<PathBuf>,
    /// Whether devirtualization went through the fallback tool
    pub used_fallback: bool,
}

impl JobOutcome {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from(self.success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Success,
    Failure,
}

impl From<bool> for JobStatus {
    fn from(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}
