//! Process port: every external tool and every git/build call goes through here
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::DeobError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Indexes into `args` that are masked when the command is displayed
    masked: Vec<usize>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            masked: Vec::new(),
        }
    }

    /// Adds an argument that never shows up in logs or error messages
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.masked.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for (index, arg) in self.args.iter().enumerate() {
            if self.masked.contains(&index) {
                write!(f, " ***")?;
            } else {
                write!(f, " {}", quote(arg))?;
            }
        }
        Ok(())
    }
}

fn quote(part: &str) -> String {
    if part.is_empty() || part.contains(char::is_whitespace) {
        format!("\"{part}\"")
    } else {
        part.to_string()
    }
}

/// Fully buffered result of one process run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs the command to completion. A non-zero exit is not an error here.
    async fn execute(&self, cmd: &ShellCommand) -> Result<CommandOutput, DeobError>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor {
    timeout: Option<Duration>,
}

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn prepare_command(&self, cmd: &ShellCommand) -> Command {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);

        if let Some(dir) = &cmd.working_dir {
            command.current_dir(dir);
        }

        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.kill_on_drop(true);
        command
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, cmd: &ShellCommand) -> Result<CommandOutput, DeobError> {
        tracing::trace!(command = %cmd, "spawning");

        let child = match self.prepare_command(cmd).spawn() {
            Ok(child) => child,
            Err(err) => {
                // A missing tool binary surfaces as an ordinary failed run
                return Ok(CommandOutput {
                    stdout: String::new(),
                    stderr: format!("Failed to spawn '{}': {err}", cmd.program),
                    exit_code: -1,
                });
            }
        };

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| DeobError::Timeout {
                    command: cmd.to_string(),
                    seconds: limit.as_secs(),
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|err| DeobError::io(format!("waiting for {}", cmd.program), err))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Runs `cmd` and turns a non-zero exit into [`DeobError::ProcessFailed`]
pub async fn run_checked(
    executor: &dyn CommandExecutor,
    cmd: &ShellCommand,
) -> Result<CommandOutput, DeobError> {
    let output = executor.execute(cmd).await?;

    if !output.success() {
        return Err(DeobError::ProcessFailed {
            command: cmd.to_string(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(CommandOutput);

    #[async_trait]
    impl CommandExecutor for Canned {
        async fn execute(&self, _cmd: &ShellCommand) -> Result<CommandOutput, DeobError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn display_quotes_paths_with_spaces() {
        let cmd = ShellCommand::new("de4dot")
            .arg("--dont-rename")
            .arg("/tmp/my dir/a.dll");

        assert_eq!(cmd.to_string(), "de4dot --dont-rename \"/tmp/my dir/a.dll\"");
    }

    #[test]
    fn display_masks_secrets() {
        let cmd = ShellCommand::new("decoder")
            .args(["-i", "a.dll", "-p"])
            .secret_arg("hunter2");

        assert_eq!(cmd.args.last().map(String::as_str), Some("hunter2"));
        assert_eq!(cmd.to_string(), "decoder -i a.dll -p ***");
    }

    #[tokio::test]
    async fn non_zero_exit_becomes_process_failed() {
        let executor = Canned(CommandOutput {
            stdout: "partial".to_string(),
            stderr: "fatal".to_string(),
            exit_code: 3,
        });
        let cmd = ShellCommand::new("tool").arg("x");

        match run_checked(&executor, &cmd).await {
            Err(DeobError::ProcessFailed {
                command,
                exit_code,
                stdout,
                stderr,
            }) => {
                assert_eq!(command, "tool x");
                assert_eq!(exit_code, 3);
                assert_eq!(stdout, "partial");
                assert_eq!(stderr, "fatal");
            }
            other => panic!("expected ProcessFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_exit_passes_output_through() {
        let executor = Canned(CommandOutput {
            stdout: "done".to_string(),
            ..Default::default()
        });

        let output = run_checked(&executor, &ShellCommand::new("tool")).await.unwrap();
        assert_eq!(output.stdout, "done");
    }

    #[tokio::test]
    async fn missing_binary_reports_failed_run() {
        let executor = SystemCommandExecutor::new();
        let cmd = ShellCommand::new("/definitely/not/a/real/tool.exe");

        let output = executor.execute(&cmd).await.unwrap();
        assert_eq!(output.exit_code, -1);
        assert!(output.stderr.contains("Failed to spawn"));
    }
}
