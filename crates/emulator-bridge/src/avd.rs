//! AVD (Android Virtual Device) Manager
//!
//! Creates and lists Android Virtual Devices through `avdmanager` and
//! `emulator -list-avds`.

use ci_lifecycle_core::EmulatorConfig;
use tracing::{info, warn};

use crate::process::{CommandOutput, CommandSpec, ProcessError, ProcessLauncher};

/// AVD to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvdSpec {
    pub name: String,
    /// System image package
    pub package: String,
    /// Overwrite an existing AVD of the same name
    pub force: bool,
}

impl AvdSpec {
    /// AVD `android<version>` on the configured image for that platform
    /// version. Overwrites any previous AVD with the same name.
    pub fn for_version(version: &str, config: &EmulatorConfig) -> Self {
        Self {
            name: avd_name(version),
            package: format!(
                "system-images;android-{};{};{}",
                version, config.image_variant, config.abi
            ),
            force: true,
        }
    }
}

/// Name of the AVD created for `version`
pub fn avd_name(version: &str) -> String {
    format!("android{}", version)
}

/// AVD Manager
pub struct AvdManager<'a, L: ProcessLauncher + ?Sized> {
    launcher: &'a L,
    avdmanager: String,
    emulator: String,
}

impl<'a, L: ProcessLauncher + ?Sized> AvdManager<'a, L> {
    /// Create a new AVD manager
    pub fn new(launcher: &'a L, config: &EmulatorConfig) -> Self {
        Self {
            launcher,
            avdmanager: config.avdmanager.clone(),
            emulator: config.emulator.clone(),
        }
    }

    /// Command that creates `spec`
    pub fn create_command(&self, spec: &AvdSpec) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.avdmanager)
            .args(["create", "avd", "-n", spec.name.as_str(), "-k", spec.package.as_str()]);

        if spec.force {
            cmd = cmd.arg("--force");
        }

        // Answer "no" to the custom hardware profile question
        cmd.stdin("no\n")
    }

    /// Create a new AVD
    pub async fn create_avd(&self, spec: &AvdSpec) -> Result<CommandOutput, ProcessError> {
        let cmd = self.create_command(spec);
        info!("Creating AVD {} from {}", spec.name, spec.package);
        info!("{}", cmd.display());

        let output = self.launcher.run(&cmd).await?;
        log_tool_output("avdmanager", &output);

        if output.success() {
            info!("AVD created successfully: {}", spec.name);
        }

        Ok(output)
    }

    /// List AVD names known to the emulator
    pub async fn list_avds(&self) -> Result<Vec<String>, ProcessError> {
        let cmd = CommandSpec::new(&self.emulator).arg("-list-avds");
        let output = self.launcher.run(&cmd).await?;
        log_tool_output("emulator -list-avds", &output);

        Ok(parse_avd_list(&output.stdout))
    }
}

fn parse_avd_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        // the emulator prints INFO/WARNING lines alongside the names
        .filter(|l| !l.is_empty() && !l.contains('|') && !l.starts_with("INFO") && !l.starts_with("WARNING"))
        .map(str::to_string)
        .collect()
}

/// Print a tool's output as diagnostics. A non-zero exit is only a warning.
pub(crate) fn log_tool_output(tool: &str, output: &CommandOutput) {
    let stdout = output.stdout.trim_end();
    let stderr = output.stderr.trim_end();

    if !stdout.is_empty() {
        info!("{} stdout:\n{}", tool, stdout);
    }
    if !stderr.is_empty() {
        info!("{} stderr:\n{}", tool, stderr);
    }
    if !output.success() {
        warn!(code = ?output.code, "{} exited unsuccessfully", tool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::{ok_output, RecordingLauncher};

    #[test]
    fn test_spec_for_version() {
        let spec = AvdSpec::for_version("30", &EmulatorConfig::default());
        assert_eq!(spec.name, "android30");
        assert_eq!(spec.package, "system-images;android-30;default;x86");
        assert!(spec.force);
    }

    #[test]
    fn test_create_command() {
        let launcher = RecordingLauncher::new();
        let manager = AvdManager::new(&launcher, &EmulatorConfig::default());
        let cmd = manager.create_command(&AvdSpec::for_version("29", &EmulatorConfig::default()));

        assert_eq!(cmd.program, "avdmanager");
        assert_eq!(
            cmd.args,
            vec!["create", "avd", "-n", "android29", "-k", "system-images;android-29;default;x86", "--force"]
        );
        assert_eq!(cmd.stdin.as_deref(), Some("no\n"));
    }

    #[tokio::test]
    async fn test_create_avd_tolerates_tool_failure() {
        let launcher = RecordingLauncher::responding(|_| {
            Ok(CommandOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "Package path is not valid".to_string(),
            })
        });
        let manager = AvdManager::new(&launcher, &EmulatorConfig::default());

        let output = manager
            .create_avd(&AvdSpec::for_version("30", &EmulatorConfig::default()))
            .await
            .unwrap();
        assert!(!output.success());
        assert_eq!(launcher.runs().len(), 1);
    }

    #[tokio::test]
    async fn test_list_avds() {
        let launcher = RecordingLauncher::responding(|_| {
            Ok(ok_output("INFO    | Storing crashdata\nandroid29\nandroid30\n\n"))
        });
        let manager = AvdManager::new(&launcher, &EmulatorConfig::default());

        assert_eq!(manager.list_avds().await.unwrap(), vec!["android29", "android30"]);
        assert_eq!(launcher.runs()[0].display(), "emulator -list-avds");
    }
}
