//! deob-bulk entry point.
//!
//! Usage:
//!   deob-bulk -f versions.tsv -p <password>            # Whole list, one at a time
//!   deob-bulk -f versions.tsv -p <password> -P 4 -r out.tsv
//!   deob-bulk -f versions.tsv -p <password> -V 20240101 -D

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use deob_bulk::{load_versions, BatchConfig, BatchJob, BatchRunner};
use deob_core::{JobFlags, Pipeline, SystemCommandExecutor};
use deob_stages::stage_chain;
use deob_toolchain::{ToolManifest, Toolchain};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "deob-bulk")]
#[command(about = "Deobfuscate every assembly listed in a versions file")]
struct BulkOptions {
    /// Tab-separated versions file (`version<TAB>filename`)
    #[arg(short = 'f', long = "versions")]
    versions: PathBuf,

    /// Only process this version
    #[arg(short = 'V', long = "version")]
    version: Option<String>,

    /// Symbol password for the decoder
    #[arg(short, long)]
    password: String,

    /// Also decompile to a project directory
    #[arg(short = 'D', long)]
    decompile: bool,

    /// Run every stage but publish nothing
    #[arg(short, long)]
    dry_run: bool,

    /// Maximum number of jobs in flight
    #[arg(short = 'P', long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    parallelism: u16,

    /// Write a version/status table here
    #[arg(short, long)]
    report: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,

    /// Tool manifest overriding the built-in one
    #[arg(long)]
    tools: Option<PathBuf>,

    /// Where tool checkouts live
    #[arg(long, default_value = ".")]
    tools_dir: PathBuf,

    /// Per-stage process timeout in seconds
    #[arg(long)]
    stage_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let options = BulkOptions::parse();

    // RUST_LOG wins over --verbose
    let default_level = if options.verbose { "trace" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match run(options).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(options: BulkOptions) -> Result<ExitCode> {
    let entries = load_versions(&options.versions)
        .await
        .context("Failed to load versions list")?;

    let manifest = match &options.tools {
        Some(path) => ToolManifest::load(path)?,
        None => ToolManifest::builtin()?,
    };

    let toolchain = Arc::new(Toolchain::new(
        manifest,
        &options.tools_dir,
        Arc::new(SystemCommandExecutor::new()),
    ));
    toolchain
        .setup()
        .await
        .context("Failed to set up dependencies")?;

    for status in toolchain.status().await.into_iter().filter(|status| !status.present) {
        tracing::warn!("{} ({}) is not built, its stage will fail", status.name, status.role);
    }

    let stage_executor = Arc::new(SystemCommandExecutor::with_timeout(
        options.stage_timeout.map(Duration::from_secs),
    ));
    let pipeline = Arc::new(Pipeline::new(
        toolchain.clone(),
        stage_chain(&toolchain, stage_executor),
    ));

    let config = BatchConfig {
        password: options.password,
        flags: JobFlags {
            dry_run: options.dry_run,
            decompile: options.decompile,
        },
        parallelism: usize::from(options.parallelism),
        only_version: options.version,
    };

    let jobs = BatchJob::plan(&entries, &config);
    if jobs.is_empty() {
        tracing::warn!("Nothing to do");
    }

    let report = BatchRunner::new(pipeline, config.parallelism).run(jobs).await;

    if let Some(path) = &options.report {
        report
            .write_to(path)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    println!("{}", report.summary());
    Ok(ExitCode::SUCCESS)
}
