//! Devirtualization stage and the parser for eazdevirt's console output.
//!
//! eazdevirt exits cleanly even when it only converted part of the virtualized
//! methods, so completeness is read from its output:
//!
//! ```text
//! dnlib.DotNet.TypeResolveException: Could not resolve type: Foo.Bar
//! Devirtualized 7/10 methods
//! ```
//!
//! A handful of crash signatures mean this build of eazdevirt cannot handle
//! the assembly at all; those surface as [`DeobError::StageFailed`] so the
//! pipeline can switch to the fallback build.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use deob_core::{DeobError, JobContext, Stage, StageResult};
use lazy_static::lazy_static;
use regex::Regex;

use crate::ToolInvoker;

/// Exceptions after which the output of this eazdevirt build is unusable
pub const FATAL_SIGNATURES: &[&str] = &[
    "System.IO.EndOfStreamException",
    "System.IndexOutOfRangeException",
    "System.OverflowException",
];

lazy_static! {
    /// Final progress line
    static ref PROGRESS: Regex =
        Regex::new(r"Devirtualized (?P<ok>\d+)/(?P<total>\d+) methods").unwrap();

    /// Type the devirtualizer could not resolve from the dependency set
    static ref MISSING_TYPE: Regex = Regex::new(
        r"dnlib\.DotNet\.TypeResolveException: Could not resolve type: (?P<type>.+)"
    ).unwrap();
}

/// What eazdevirt reported about one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevirtReport {
    pub devirtualized: u64,
    pub total: u64,
    pub missing_types: BTreeSet<String>,
}

impl DevirtReport {
    pub fn is_complete(&self) -> bool {
        self.devirtualized == self.total
    }

    /// First crash signature found in `output`, if any
    pub fn fatal_signature(output: &str) -> Option<&'static str> {
        FATAL_SIGNATURES
            .iter()
            .copied()
            .find(|signature| output.contains(signature))
    }

    /// Reads the progress counts and unresolved types. `None` when the output
    /// carries no progress line.
    pub fn parse(output: &str) -> Option<Self> {
        let mut progress = None;
        let mut missing_types = BTreeSet::new();

        for line in output.lines() {
            if let Some(caps) = PROGRESS.captures(line) {
                if let (Ok(ok), Ok(total)) = (caps["ok"].parse::<u64>(), caps["total"].parse::<u64>()) {
                    progress = Some((ok, total));
                }
                continue;
            }

            if let Some(caps) = MISSING_TYPE.captures(line) {
                missing_types.insert(caps["type"].trim().to_string());
            }
        }

        progress.map(|(devirtualized, total)| Self {
            devirtualized,
            total,
            missing_types,
        })
    }
}

pub struct DevirtualizeStage {
    tool: ToolInvoker,
}

impl DevirtualizeStage {
    pub fn new(tool: ToolInvoker) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl Stage for DevirtualizeStage {
    fn id(&self) -> &'static str {
        "devirtualize"
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
        let cmd = self.tool.command().arg("-d").arg(input.to_string_lossy());
        let output = self.tool.run(cmd).await?;
        let name = format!("{stem}-devirtualized.dll");

        let captured = format!("{}\n{}", output.stdout, output.stderr);
        if let Some(signature) = DevirtReport::fatal_signature(&captured) {
            return Err(DeobError::StageFailed {
                stage: self.tool.name().to_string(),
                reason: signature.to_string(),
            });
        }

        let Some(report) = DevirtReport::parse(&output.stdout) else {
            tracing::info!("{}", output.stdout);
            return Ok(StageResult::partial(name, Vec::new()));
        };

        if report.is_complete() {
            tracing::info!("Devirtualized {} / {} methods", report.devirtualized, report.total);
            return Ok(StageResult::ok(name));
        }

        tracing::error!("Devirtualized {} / {} methods", report.devirtualized, report.total);
        if report.missing_types.is_empty() {
            tracing::warn!("Extra errors detected! Run with --verbose for a full stack trace.");
        } else {
            for missing in &report.missing_types {
                tracing::warn!("Missing type: {missing}");
            }
        }
        tracing::debug!("{}", output.stdout);

        Ok(StageResult::partial(
            name,
            report.missing_types.into_iter().collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_run() {
        let report = DevirtReport::parse("Loading...\nDevirtualized 10/10 methods\n").unwrap();

        assert_eq!(report.devirtualized, 10);
        assert_eq!(report.total, 10);
        assert!(report.is_complete());
        assert!(report.missing_types.is_empty());
    }

    #[test]
    fn partial_run_collects_missing_types() {
        let output = "\
dnlib.DotNet.TypeResolveException: Could not resolve type: osu.Game.Beatmap
   at dnlib.DotNet.TypeDef.Resolve()
dnlib.DotNet.TypeResolveException: Could not resolve type: osu.Game.Beatmap  
dnlib.DotNet.TypeResolveException: Could not resolve type: System.Windows.Forms.Form
Devirtualized 7/10 methods";

        let report = DevirtReport::parse(output).unwrap();

        assert_eq!((report.devirtualized, report.total), (7, 10));
        assert!(!report.is_complete());
        let types: Vec<&str> = report.missing_types.iter().map(String::as_str).collect();
        assert_eq!(types, vec!["System.Windows.Forms.Form", "osu.Game.Beatmap"]);
    }

    #[test]
    fn last_progress_line_wins() {
        let report =
            DevirtReport::parse("Devirtualized 1/10 methods\nDevirtualized 9/10 methods").unwrap();
        assert_eq!(report.devirtualized, 9);
    }

    #[test]
    fn no_progress_line() {
        assert_eq!(DevirtReport::parse("Usage: eazdevirt [options]"), None);
    }

    #[test]
    fn crash_signatures() {
        assert_eq!(
            DevirtReport::fatal_signature("Unhandled: System.OverflowException: Arithmetic"),
            Some("System.OverflowException")
        );
        assert_eq!(
            DevirtReport::fatal_signature("System.IO.EndOfStreamException at Read"),
            Some("System.IO.EndOfStreamException")
        );
        assert_eq!(DevirtReport::fatal_signature("Devirtualized 10/10 methods"), None);
    }
}
