//! Lifecycle tests: a fake executor stands in for git and the build program
//! and materializes checkouts and artifacts on disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deob_core::{CommandExecutor, CommandOutput, DeobError, ReadinessGate, ShellCommand};
use deob_toolchain::{ToolManifest, ToolRole, Toolchain, ToolchainError};

#[derive(Default)]
struct FakeExecutor {
    log: Mutex<Vec<ShellCommand>>,
    /// Tools whose build exits cleanly but leaves no artifact
    broken_builds: Vec<String>,
    /// Clone URLs that cannot be reached
    unreachable: Vec<String>,
}

impl FakeExecutor {
    fn commands(&self) -> Vec<ShellCommand> {
        self.log.lock().unwrap().clone()
    }

    fn count(&self, program: &str, first_arg: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.program == program && c.args.first().map(String::as_str) == Some(first_arg))
            .count()
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn execute(&self, cmd: &ShellCommand) -> Result<CommandOutput, DeobError> {
        self.log.lock().unwrap().push(cmd.clone());
        // Yield so concurrent setups genuinely overlap
        tokio::time::sleep(Duration::from_millis(5)).await;

        match (cmd.program.as_str(), cmd.args.first().map(String::as_str)) {
            ("git", Some("clone")) => {
                if self.unreachable.contains(&cmd.args[1]) {
                    return Ok(CommandOutput {
                        stderr: "fatal: repository not found".to_string(),
                        exit_code: 128,
                        ..Default::default()
                    });
                }
                let checkout = Path::new(&cmd.args[2]);
                std::fs::create_dir_all(checkout).unwrap();
                std::fs::write(checkout.join("README.md"), "").unwrap();
            }
            ("msbuild", Some(solution)) if solution.ends_with(".sln") => {
                // Like msbuild, a relative solution resolves against the cwd
                let solution = cmd.working_dir.clone().unwrap().join(solution);
                let checkout = solution.parent().unwrap().to_path_buf();
                let name = checkout.file_name().unwrap().to_string_lossy().into_owned();
                if !self.broken_builds.contains(&name) {
                    let artifact = checkout.join(artifact_for(&name));
                    std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
                    std::fs::write(artifact, "").unwrap();
                }
            }
            _ => {}
        }

        Ok(CommandOutput::default())
    }
}

fn manifest() -> ToolManifest {
    ToolManifest::builtin().unwrap()
}

fn artifact_for(name: &str) -> PathBuf {
    let manifest = manifest();
    ToolRole::ALL
        .iter()
        .map(|role| manifest.tools.get(*role))
        .find(|spec| spec.name == name)
        .map(|spec| spec.artifact.clone())
        .unwrap()
}

fn toolchain(dir: &Path, executor: Arc<FakeExecutor>) -> Toolchain {
    Toolchain::new(manifest(), dir, executor)
}

#[tokio::test]
async fn gate_is_closed_until_setup_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let tc = toolchain(tmp.path(), Arc::new(FakeExecutor::default()));

    assert!(matches!(tc.ensure(), Err(DeobError::SetupRequired)));
    tc.setup().await.unwrap();
    assert!(tc.ensure().is_ok());
}

#[tokio::test]
async fn setup_fetches_and_builds_every_tool() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = Arc::new(FakeExecutor::default());
    let tc = toolchain(tmp.path(), executor.clone());

    tc.setup().await.unwrap();

    assert_eq!(executor.count("git", "clone"), 6);
    assert!(tc.status().await.iter().all(|s| s.present));
    assert!(tc.handle(ToolRole::Decompile).artifact_path().is_file());
}

#[tokio::test]
async fn concurrent_setup_clones_each_tool_once() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = Arc::new(FakeExecutor::default());
    let tc = toolchain(tmp.path(), executor.clone());

    let (a, b) = tokio::join!(tc.setup(), tc.setup());
    a.unwrap();
    b.unwrap();
    tc.setup().await.unwrap();

    assert_eq!(executor.count("git", "clone"), 6);
    let builds = executor
        .commands()
        .iter()
        .filter(|c| c.program == "msbuild" && c.args[0].ends_with(".sln"))
        .count();
    assert_eq!(builds, 6);
}

#[tokio::test]
async fn existing_checkouts_and_artifacts_are_reused() {
    let tmp = tempfile::tempdir().unwrap();
    let first = Arc::new(FakeExecutor::default());
    toolchain(tmp.path(), first).setup().await.unwrap();

    let second = Arc::new(FakeExecutor::default());
    let tc = toolchain(tmp.path(), second.clone());
    tc.setup().await.unwrap();

    assert!(second.commands().is_empty());
    assert!(tc.is_ready());
}

#[tokio::test]
async fn pinned_revision_submodules_and_restore_run_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = Arc::new(FakeExecutor::default());
    let tc = toolchain(tmp.path(), executor.clone());
    tc.setup().await.unwrap();

    let decoder_dir = tmp.path().join("osu-decoder");
    let decoder_path = decoder_dir.to_string_lossy().into_owned();
    let decoder: Vec<String> = executor
        .commands()
        .iter()
        .filter(|c| c.working_dir.as_deref() == Some(decoder_dir.as_path()) || c.args.contains(&decoder_path))
        .map(|c| c.args.join(" "))
        .collect();

    let sln = decoder_dir.join("osu!decoder.sln").to_string_lossy().into_owned();
    assert_eq!(
        decoder,
        vec![
            format!("clone https://github.com/Umbranoxio/osu-decoder {decoder_path}"),
            "submodule init".to_string(),
            "submodule update".to_string(),
            format!("-t:restore {sln}"),
            format!("{sln} /p:Configuration=Release"),
        ]
    );

    let de4dot_dir = tmp.path().join("de4dot");
    let reset = executor
        .commands()
        .into_iter()
        .find(|c| c.working_dir.as_deref() == Some(de4dot_dir.as_path()) && c.args[0] == "reset")
        .unwrap();
    assert_eq!(reset.args, vec!["reset", "--hard", "22bc21240115e8572c8a702288f2e26fd4a51ca8"]);
    // de4dot, eazdevirt and ILSpy are pinned; the fallback devirtualizer is not
    assert_eq!(executor.count("git", "reset"), 3);
}

#[tokio::test]
async fn relative_tools_dir_builds_from_inside_each_checkout() {
    let tmp = tempfile::Builder::new()
        .prefix("tools-")
        .tempdir_in(".")
        .unwrap();
    let relative = PathBuf::from(tmp.path().file_name().unwrap());
    let executor = Arc::new(FakeExecutor::default());
    let tc = toolchain(&relative, executor.clone());

    tc.setup().await.unwrap();

    let decode = tc.handle(ToolRole::Decode);
    assert!(decode.checkout_dir().is_absolute());
    assert!(tc.status().await.iter().all(|s| s.present));
    for cmd in executor.commands().iter().filter(|c| c.program == "msbuild") {
        let solution = cmd.args.iter().find(|a| a.ends_with(".sln")).unwrap();
        assert!(Path::new(solution).is_absolute(), "{cmd}");
    }
}

#[tokio::test]
async fn failed_build_is_logged_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = Arc::new(FakeExecutor {
        broken_builds: vec!["EazFixer".to_string()],
        ..Default::default()
    });
    let tc = toolchain(tmp.path(), executor);

    tc.setup().await.unwrap();

    assert!(tc.ensure().is_ok());
    let fix = tc
        .status()
        .await
        .into_iter()
        .find(|s| s.role == ToolRole::Fix)
        .unwrap();
    assert_eq!(fix.name, "EazFixer");
    assert!(!fix.present);
    assert!(!tc.handle(ToolRole::Fix).is_present().await);
}

#[tokio::test]
async fn unreachable_source_aborts_setup() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = Arc::new(FakeExecutor {
        unreachable: vec!["https://github.com/icsharpcode/ILSpy".to_string()],
        ..Default::default()
    });
    let tc = toolchain(tmp.path(), executor);

    let err = tc.setup().await.unwrap_err();

    assert!(matches!(err, ToolchainError::Fetch { ref tool, .. } if tool == "ILSpy"));
    assert!(matches!(tc.ensure(), Err(DeobError::SetupRequired)));
}
