//! CLI commands for ci-lifecycle
//!
//! Each lifecycle command is one invocation of the action: the runner calls
//! the same command again as the post step, and the phase router decides
//! which half runs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use ci_lifecycle_core::{
    dispatch, CiPlatform, EmulatorConfig, LifecycleConfig, LifecycleError, Phase, PhaseOutcome,
};
use ci_lifecycle_emulator_bridge::{
    sdk_root_from_env, EmulatorAction, EmulatorTarget, EmulatorTerminator, TerminationReport,
    TokioLauncher,
};
use ci_lifecycle_secret_file::{FsSecretFiles, SecretFileAction};
use tracing::{info, warn};

/// Subcommand name of the built-in termination routine
pub const TERMINATE_SUBCOMMAND: &str = "terminate-emulators";

/// Configuration to run `phase` with.
///
/// A broken config fails setup. Teardown logs it and carries on with the
/// defaults so the resource is still reclaimed.
pub fn config_for_phase(
    loaded: Result<LifecycleConfig, LifecycleError>,
    phase: Phase,
) -> Result<LifecycleConfig, LifecycleError> {
    match (loaded, phase) {
        (Ok(config), _) => Ok(config),
        (Err(e), Phase::Teardown) => {
            warn!("Invalid configuration, using defaults for teardown: {}", e);
            Ok(LifecycleConfig::default())
        }
        (Err(e), Phase::Setup) => Err(e),
    }
}

/// Emulator lifecycle command
pub struct EmulatorCommand {
    /// Emulator tool settings
    pub config: EmulatorConfig,
    /// Program that hosts the `terminate-emulators` subcommand
    pub program: PathBuf,
}

impl EmulatorCommand {
    /// Argv of the termination routine teardown runs by default
    pub fn default_termination(&self) -> Vec<String> {
        vec![
            self.program.to_string_lossy().into_owned(),
            TERMINATE_SUBCOMMAND.to_string(),
            "--timeout-secs".to_string(),
            self.config.termination_timeout_secs.to_string(),
        ]
    }

    /// Execute the emulator command
    pub async fn execute(&self, platform: &dyn CiPlatform) -> PhaseOutcome {
        let action = EmulatorAction::new(
            TokioLauncher,
            self.config.clone(),
            sdk_root_from_env(),
            self.default_termination(),
        );
        dispatch(&action, platform).await
    }
}

/// Secret file lifecycle command
pub struct SecretFileCommand {
    /// Where unnamed secret files are allocated; system temp dir if unset
    pub temp_dir: Option<PathBuf>,
}

impl SecretFileCommand {
    /// Execute the secret file command
    pub async fn execute(&self, platform: &dyn CiPlatform) -> PhaseOutcome {
        let files = match &self.temp_dir {
            Some(dir) => FsSecretFiles::new().with_temp_dir(dir.clone()),
            None => FsSecretFiles::new(),
        };
        dispatch(&SecretFileAction::new(files), platform).await
    }
}

/// Emulator termination routine
pub struct TerminateEmulatorsCommand {
    /// Directory containing the `adb` binary
    pub adb_home: PathBuf,
    /// Stop only this emulator; requires `avd_name`
    pub emulator_serial: Option<String>,
    /// AVD of `emulator_serial`
    pub avd_name: Option<String>,
    /// Per-command timeout
    pub timeout: Duration,
}

impl TerminateEmulatorsCommand {
    /// Execute the termination routine
    pub async fn execute(&self) -> Result<TerminationReport> {
        let target = EmulatorTarget::from_parts(self.emulator_serial.clone(), self.avd_name.clone())?;

        let launcher = TokioLauncher;
        let report = EmulatorTerminator::new(&launcher, &self.adb_home, self.timeout)
            .stop_emulators(target.as_ref())
            .await?;

        info!(
            stopped = ?report.stopped,
            killed = ?report.killed,
            "emulator termination finished"
        );
        Ok(report)
    }
}
