//! Process Launcher
//!
//! Runs external tools either to completion or fully detached. The
//! environment a tool sees is passed explicitly on the `CommandSpec`;
//! nothing here touches the launching process's own environment.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Process errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A command to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Variables added to the child's environment
    pub env: BTreeMap<String, String>,
    /// Written to the child's stdin, which is then closed
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Build from an argv vector; `None` if it is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args))
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

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| {
                if part.is_empty() || part.contains(|c: char| c.is_whitespace() || c == ';' || c == '\'') {
                    format!("'{}'", part.replace('\'', r"'\''"))
                } else {
                    part.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability for running external tools
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run to completion and capture output
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError>;

    /// Start without waiting. Output goes nowhere; returns the pid if known.
    async fn spawn_detached(&self, spec: &CommandSpec) -> Result<Option<u32>, ProcessError>;
}

/// `ProcessLauncher` over `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl TokioLauncher {
    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).envs(&spec.env);
        cmd
    }
}

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        debug!("running {}", spec.display());

        let mut cmd = Self::command(spec);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        if let (Some(input), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
            // The tool may exit without reading its prompt answer
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ProcessError::Timeout {
                    program: spec.program.clone(),
                    secs: limit.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn spawn_detached(&self, spec: &CommandSpec) -> Result<Option<u32>, ProcessError> {
        debug!("spawning detached {}", spec.display());

        let mut cmd = Self::command(spec);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        // Own process group so job-control signals aimed at us skip the child
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        Ok(child.id())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_awkward_args() {
        let spec = CommandSpec::new("avdmanager")
            .args(["create", "avd", "-k", "system-images;android-30;default;x86"]);
        assert_eq!(
            spec.display(),
            "avdmanager create avd -k 'system-images;android-30;default;x86'"
        );
    }

    #[test]
    fn test_from_argv() {
        let argv = vec!["python3".to_string(), "terminate.py".to_string()];
        let spec = CommandSpec::from_argv(&argv).unwrap();
        assert_eq!(spec.program, "python3");
        assert_eq!(spec.args, vec!["terminate.py"]);
        assert!(CommandSpec::from_argv(&[]).is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_passes_env_and_stdin() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "read answer; echo \"$answer $ADB_HOME\""])
            .env("ADB_HOME", "/sdk/platform-tools")
            .stdin("no\n");

        let output = TokioLauncher.run(&spec).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "no /sdk/platform-tools");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_exit_code() {
        let spec = CommandSpec::new("sh").args(["-c", "echo oops >&2; exit 3"]);
        let output = TokioLauncher.run(&spec).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out() {
        let spec = CommandSpec::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(100));
        let err = TokioLauncher.run(&spec).await.unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_detached_returns_immediately() {
        let spec = CommandSpec::new("sleep").arg("2");
        let started = std::time::Instant::now();
        let pid = TokioLauncher.spawn_detached(&spec).await.unwrap();
        assert!(pid.is_some());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let spec = CommandSpec::new("definitely-not-a-real-tool-4821");
        let err = TokioLauncher.run(&spec).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
