//! ADB (Android Debug Bridge) Client
//!
//! The handful of adb operations needed to find and stop emulators.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::process::{CommandSpec, ProcessError, ProcessLauncher};

/// ADB errors
#[derive(Debug, thiserror::Error)]
pub enum AdbError {
    #[error("ADB command failed: {0}")]
    CommandFailed(String),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl AdbError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AdbError::Process(ProcessError::Timeout { .. }))
    }
}

/// ADB Client
pub struct AdbClient<'a, L: ProcessLauncher + ?Sized> {
    launcher: &'a L,
    adb: PathBuf,
}

impl<'a, L: ProcessLauncher + ?Sized> AdbClient<'a, L> {
    /// Client for the adb binary inside `adb_home`
    pub fn new(launcher: &'a L, adb_home: &Path) -> Self {
        Self {
            launcher,
            adb: adb_home.join("adb"),
        }
    }

    fn command(&self, args: &[&str], timeout: Duration) -> CommandSpec {
        CommandSpec::new(self.adb.to_string_lossy())
            .args(args.iter().copied())
            .timeout(timeout)
    }

    /// Serials of attached emulators, as listed by `adb devices`
    pub async fn list_emulators(&self, timeout: Duration) -> Result<Vec<String>, AdbError> {
        let output = self.launcher.run(&self.command(&["devices"], timeout)).await?;

        if !output.success() {
            return Err(AdbError::CommandFailed(output.stderr.trim().to_string()));
        }

        let emulators = parse_emulator_serials(&output.stdout);
        debug!("adb devices found emulators: {:?}", emulators);
        Ok(emulators)
    }

    /// Ask the emulator console to shut down (`adb -s <serial> emu kill`).
    ///
    /// Only a timeout is an error; the exit status is not checked, matching
    /// how adb reports emulators that are already going away.
    pub async fn emu_kill(&self, serial: &str, timeout: Duration) -> Result<(), AdbError> {
        let output = self
            .launcher
            .run(&self.command(&["-s", serial, "emu", "kill"], timeout))
            .await?;
        debug!(serial, code = ?output.code, "adb emu kill finished");
        Ok(())
    }
}

fn parse_emulator_serials(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.contains("emulator"))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
