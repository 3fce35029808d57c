//! Dependency lifecycle: fetch every tool once, build it once, gate until ready
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use deob_core::{run_checked, CommandExecutor, DeobError, ReadinessGate, ShellCommand};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::error::ToolchainError;
use crate::handle::ToolHandle;
use crate::manifest::{ToolManifest, ToolRole};

/// Snapshot of one tool for status output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub role: ToolRole,
    pub name: String,
    pub present: bool,
}

pub struct Toolchain {
    handles: HashMap<ToolRole, Arc<ToolHandle>>,
    builder: Builder,
    setup: OnceCell<()>,
}

impl Toolchain {
    pub fn new(
        manifest: ToolManifest,
        tools_dir: impl Into<PathBuf>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        // Build commands run inside the checkout, so every path handed to
        // them must not depend on the process cwd
        let tools_dir = tools_dir.into();
        let tools_dir = std::path::absolute(&tools_dir).unwrap_or(tools_dir);
        let handles = ToolRole::ALL
            .iter()
            .map(|role| {
                let spec = manifest.tools.get(*role).clone();
                (*role, Arc::new(ToolHandle::new(spec, &tools_dir)))
            })
            .collect();

        Self {
            handles,
            builder: Builder {
                executor,
                build_program: manifest.build_program,
                configuration: manifest.configuration,
            },
            setup: OnceCell::new(),
        }
    }

    pub fn handle(&self, role: ToolRole) -> Arc<ToolHandle> {
        // Every role is inserted by `new`
        self.handles[&role].clone()
    }

    pub fn is_ready(&self) -> bool {
        self.setup.initialized()
    }

    /// Clones and builds every tool that is missing.
    ///
    /// Runs at most once per toolchain; concurrent callers wait for the same
    /// run and later calls return immediately. A failed clone aborts setup,
    /// a failed build only leaves that tool absent.
    pub async fn setup(&self) -> Result<(), ToolchainError> {
        self.setup
            .get_or_try_init(|| self.run_setup())
            .await
            .map(|_| ())
    }

    async fn run_setup(&self) -> Result<(), ToolchainError> {
        let mut seen = HashSet::new();
        let mut tasks = JoinSet::new();

        for role in ToolRole::ALL {
            let handle = self.handle(role);
            // Two roles may share a checkout; fetch it once
            if !seen.insert(handle.checkout_dir().to_path_buf()) {
                continue;
            }

            let builder = self.builder.clone();
            let span = tracing::info_span!("tool", name = %handle.name());
            tasks.spawn(
                async move {
                    builder.fetch(&handle).await?;
                    builder.build(&handle).await;
                    Ok::<_, ToolchainError>(())
                }
                .instrument(span),
            );
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|err| {
                Err(ToolchainError::Setup {
                    tool: "unknown".to_string(),
                    reason: err.to_string(),
                })
            });

            if let Err(err) = result {
                tracing::error!("{err}");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                tracing::info!("toolchain ready");
                Ok(())
            }
        }
    }

    pub async fn status(&self) -> Vec<ToolStatus> {
        let mut status = Vec::with_capacity(ToolRole::ALL.len());
        for role in ToolRole::ALL {
            let handle = &self.handles[&role];
            status.push(ToolStatus {
                role,
                name: handle.name().to_string(),
                present: handle.is_present().await,
            });
        }
        status
    }
}

impl ReadinessGate for Toolchain {
    fn ensure(&self) -> Result<(), DeobError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(DeobError::SetupRequired)
        }
    }
}

#[derive(Clone)]
struct Builder {
    executor: Arc<dyn CommandExecutor>,
    build_program: String,
    configuration: String,
}

impl Builder {
    async fn fetch(&self, handle: &ToolHandle) -> Result<(), ToolchainError> {
        if !handle.is_empty().await {
            tracing::debug!("already cloned");
            return Ok(());
        }

        let spec = handle.spec();
        let checkout = handle.checkout_dir();
        let fetch_error = |source: DeobError| ToolchainError::Fetch {
            tool: handle.name().to_string(),
            source,
        };

        tracing::info!("Cloning...");
        let clone = ShellCommand::new("git")
            .arg("clone")
            .arg(spec.repo_url.as_str())
            .arg(checkout.to_string_lossy());
        run_checked(self.executor.as_ref(), &clone)
            .await
            .map_err(fetch_error)?;

        if let Some(revision) = spec.revision.as_deref().filter(|r| !r.is_empty()) {
            let reset = ShellCommand::new("git")
                .args(["reset", "--hard", revision])
                .current_dir(checkout);
            run_checked(self.executor.as_ref(), &reset)
                .await
                .map_err(fetch_error)?;
            tracing::info!("Repo reset to {revision}");
        }

        if spec.resolve_submodules {
            tracing::info!("Resolving submodules...");
            for step in ["init", "update"] {
                let submodule = ShellCommand::new("git")
                    .args(["submodule", step])
                    .current_dir(checkout);
                run_checked(self.executor.as_ref(), &submodule)
                    .await
                    .map_err(fetch_error)?;
            }
            tracing::info!("Submodules resolved.");
        }

        tracing::info!("Cloned.");
        Ok(())
    }

    async fn build(&self, handle: &ToolHandle) {
        if handle.is_present().await {
            tracing::debug!("already built");
            return;
        }

        let solution = handle.solution_path().to_string_lossy().into_owned();

        if handle.spec().restore_packages {
            tracing::info!("Restoring packages...");
            let restore = ShellCommand::new(self.build_program.as_str())
                .arg("-t:restore")
                .arg(solution.as_str())
                .current_dir(handle.checkout_dir());
            if let Err(err) = run_checked(self.executor.as_ref(), &restore).await {
                tracing::error!("Failed to restore packages for {}: {err}", handle.name());
                return;
            }
            tracing::info!("Packages restored.");
        }

        tracing::info!("Building...");
        let build = ShellCommand::new(self.build_program.as_str())
            .arg(solution.as_str())
            .arg(format!("/p:Configuration={}", self.configuration))
            .current_dir(handle.checkout_dir());
        if let Err(err) = run_checked(self.executor.as_ref(), &build).await {
            tracing::error!("{err}");
        }

        if handle.is_present().await {
            tracing::info!("Built.");
        } else {
            tracing::error!(critical = true, "Failed to build {}", handle.name());
        }
    }
}
