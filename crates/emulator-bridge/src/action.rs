//! Emulator lifecycle action
//!
//! Setup creates an AVD for the requested platform version and boots it in
//! the background. Teardown runs the termination routine against every
//! emulator of the job.
//!
//! Teardown never fails the job. CI runs it unconditionally, including
//! after a setup that failed part-way, so a missing SDK, a routine that
//! cannot be started, or one that exits non-zero are all logged and
//! tolerated.

use std::path::PathBuf;

use async_trait::async_trait;
use ci_lifecycle_core::{CiPlatform, EmulatorConfig, LifecycleAction};
use tracing::{info, warn};

use crate::avd::{log_tool_output, AvdManager, AvdSpec};
use crate::emulator::{EmulatorLauncher, EmulatorOptions};
use crate::process::{CommandSpec, ProcessLauncher};
use crate::sdk::{adb_home, ADB_HOME_VAR};
use crate::version::validate_version;

/// Platform version input
pub const VERSION_INPUT: &str = "version";

/// Output carrying the created AVD's name
pub const AVD_NAME_OUTPUT: &str = "avd_name";

/// Emulator lifecycle action
pub struct EmulatorAction<L: ProcessLauncher> {
    launcher: L,
    config: EmulatorConfig,
    sdk_root: Option<PathBuf>,
    termination: Vec<String>,
}

impl<L: ProcessLauncher> EmulatorAction<L> {
    /// `default_termination` is the termination routine's argv, used unless
    /// the config names one.
    pub fn new(
        launcher: L,
        config: EmulatorConfig,
        sdk_root: Option<PathBuf>,
        default_termination: Vec<String>,
    ) -> Self {
        let termination = config
            .termination_command
            .clone()
            .unwrap_or(default_termination);

        Self {
            launcher,
            config,
            sdk_root,
            termination,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Termination routine with `ADB_HOME` derived from the SDK root
    pub fn termination_command(&self) -> Option<CommandSpec> {
        let sdk_root = self.sdk_root.as_ref()?;
        let adb_home = adb_home(sdk_root);

        CommandSpec::from_argv(&self.termination)
            .map(|cmd| cmd.env(ADB_HOME_VAR, adb_home.to_string_lossy()))
    }
}

#[async_trait]
impl<L: ProcessLauncher> LifecycleAction for EmulatorAction<L> {
    fn name(&self) -> &'static str {
        "emulator"
    }

    async fn setup(&self, platform: &dyn CiPlatform) -> anyhow::Result<()> {
        let version = platform.get_input(VERSION_INPUT, false)?;
        validate_version(&version)?;

        let spec = AvdSpec::for_version(&version, &self.config);
        let avds = AvdManager::new(&self.launcher, &self.config);
        avds.create_avd(&spec).await?;

        if self.config.list_avds {
            let names = avds.list_avds().await?;
            info!("Available AVDs: {:?}", names);
        }

        let options = EmulatorOptions::for_ci(&self.config);
        EmulatorLauncher::new(&self.launcher, &self.config)
            .launch_detached(&spec.name, &options)
            .await?;

        platform.set_output(AVD_NAME_OUTPUT, &spec.name)?;
        Ok(())
    }

    async fn teardown(&self, _platform: &dyn CiPlatform) -> anyhow::Result<()> {
        let Some(cmd) = self.termination_command() else {
            warn!(
                sdk_root = ?self.sdk_root,
                "No SDK root or termination command; skipping emulator termination"
            );
            return Ok(());
        };

        info!("terminating emulator");
        match self.launcher.run(&cmd).await {
            Ok(output) => log_tool_output("termination routine", &output),
            Err(e) => warn!("termination routine could not run: {}", e),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingLauncher;
    use crate::process::{CommandOutput, ProcessError};
    use ci_lifecycle_core::{dispatch, MemoryPlatform, Phase};

    fn action(launcher: RecordingLauncher, sdk_root: Option<&str>) -> EmulatorAction<RecordingLauncher> {
        EmulatorAction::new(
            launcher,
            EmulatorConfig::default(),
            sdk_root.map(PathBuf::from),
            vec!["/usr/bin/ci-lifecycle".to_string(), "terminate-emulators".to_string()],
        )
    }

    #[tokio::test]
    async fn test_setup_then_teardown() {
        let action = action(RecordingLauncher::new(), Some("/opt/android"));
        let platform = MemoryPlatform::new().with_input("version", "30");

        let outcome = dispatch(&action, &platform).await;
        assert_eq!(outcome.phase, Phase::Setup);
        assert!(outcome.succeeded);

        let runs = action.launcher().runs();
        assert_eq!(
            runs[0].display(),
            "avdmanager create avd -n android30 -k 'system-images;android-30;default;x86' --force"
        );
        assert_eq!(runs[1].display(), "emulator -list-avds");

        let detached = action.launcher().detached();
        assert_eq!(detached.len(), 1);
        assert!(detached[0].args.windows(2).any(|w| w == ["-avd", "android30"]));
        assert_eq!(platform.output("avd_name").as_deref(), Some("android30"));

        let post = platform.next_phase();
        let outcome = dispatch(&action, &post).await;
        assert_eq!(outcome.phase, Phase::Teardown);
        assert!(outcome.succeeded);

        let runs = action.launcher().runs();
        let termination = runs.last().unwrap();
        assert_eq!(termination.program, "/usr/bin/ci-lifecycle");
        assert_eq!(termination.args, vec!["terminate-emulators"]);
        assert_eq!(
            termination.env.get("ADB_HOME").map(String::as_str),
            Some("/opt/android/platform-tools")
        );
    }

    #[tokio::test]
    async fn test_invalid_version_fails_before_any_command() {
        for version in ["", "thirty", "  "] {
            let action = action(RecordingLauncher::new(), Some("/opt/android"));
            let platform = MemoryPlatform::new().with_input("version", version);

            let outcome = dispatch(&action, &platform).await;

            assert!(!outcome.succeeded);
            // inputs are trimmed by the platform before validation
            let shown = version.trim();
            assert_eq!(
                platform.failures(),
                vec![format!("version needs to be numeric but is {}", shown)]
            );
            assert!(action.launcher().runs().is_empty());
        }
    }

    #[tokio::test]
    async fn test_teardown_without_setup_or_sdk_succeeds() {
        let action = action(RecordingLauncher::new(), None);
        let platform = MemoryPlatform::new().with_state("isPost", "true");

        let outcome = dispatch(&action, &platform).await;

        assert!(outcome.succeeded);
        assert!(platform.failures().is_empty());
        assert!(action.launcher().runs().is_empty());
    }

    #[tokio::test]
    async fn test_teardown_tolerates_routine_failures() {
        let failing = RecordingLauncher::responding(|_| {
            Ok(CommandOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "did not find any emulator process to kill".to_string(),
            })
        });
        let missing = RecordingLauncher::responding(|spec| {
            Err(ProcessError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });

        for launcher in [failing, missing] {
            let action = action(launcher, Some("/opt/android"));
            let platform = MemoryPlatform::new().with_state("isPost", "true");

            assert!(dispatch(&action, &platform).await.succeeded);
            assert_eq!(action.launcher().runs().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_setup_fails_when_avdmanager_cannot_start() {
        let launcher = RecordingLauncher::responding(|spec| {
            Err(ProcessError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });
        let action = action(launcher, Some("/opt/android"));
        let platform = MemoryPlatform::new().with_input("version", "30");

        let outcome = dispatch(&action, &platform).await;

        assert!(!outcome.succeeded);
        assert!(platform.failures()[0].starts_with("Failed to start avdmanager"));
        assert!(action.launcher().detached().is_empty());
    }

    #[test]
    fn test_configured_termination_command_wins() {
        let config = EmulatorConfig {
            termination_command: Some(vec![
                "python3".to_string(),
                "tools/jenkins/terminate_emulators.py".to_string(),
            ]),
            ..Default::default()
        };
        let action = EmulatorAction::new(
            RecordingLauncher::new(),
            config,
            Some(PathBuf::from("/sdk")),
            vec!["ignored".to_string()],
        );

        let cmd = action.termination_command().unwrap();
        assert_eq!(cmd.display(), "python3 tools/jenkins/terminate_emulators.py");
        assert_eq!(cmd.env.get("ADB_HOME").map(String::as_str), Some("/sdk/platform-tools"));
    }
}
