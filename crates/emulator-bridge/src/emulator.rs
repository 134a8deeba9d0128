//! Emulator Launcher
//!
//! Starts an Android emulator for an AVD as a detached background process.

use ci_lifecycle_core::EmulatorConfig;
use tracing::{debug, info};

use crate::process::{CommandSpec, ProcessError, ProcessLauncher};

/// Emulator launch options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatorOptions {
    /// GPU mode (auto, host, swiftshader_indirect, etc.)
    pub gpu: Option<String>,
    /// Run headless
    pub no_window: bool,
    /// Feature flag to enable
    pub feature: Option<String>,
    /// Memory size in MB
    pub memory: Option<u32>,
    /// System/data partition size in MB
    pub partition_size: Option<u32>,
    /// Cache partition size in MB
    pub cache_size: Option<u32>,
    /// Additional arguments
    pub extra_args: Vec<String>,
}

impl EmulatorOptions {
    /// Headless, software-rendered, fixed-size options for CI runners
    pub fn for_ci(config: &EmulatorConfig) -> Self {
        Self {
            gpu: Some(config.gpu.clone()),
            no_window: true,
            feature: Some(config.feature.clone()).filter(|f| !f.is_empty()),
            memory: Some(config.memory_mb),
            partition_size: Some(config.partition_size_mb),
            cache_size: Some(config.cache_size_mb),
            extra_args: Vec::new(),
        }
    }

    /// Arguments for `avd_name`, in the order the emulator expects them
    pub fn to_args(&self, avd_name: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(ref gpu) = self.gpu {
            args.push("-gpu".to_string());
            args.push(gpu.clone());
        }

        if self.no_window {
            args.push("-no-window".to_string());
        }

        if let Some(ref feature) = self.feature {
            args.push("-feature".to_string());
            args.push(feature.clone());
        }

        args.push("-avd".to_string());
        args.push(avd_name.to_string());

        if let Some(memory) = self.memory {
            args.push("-memory".to_string());
            args.push(memory.to_string());
        }

        if let Some(size) = self.partition_size {
            args.push("-partition-size".to_string());
            args.push(size.to_string());
        }

        if let Some(size) = self.cache_size {
            args.push("-cache-size".to_string());
            args.push(size.to_string());
        }

        args.extend(self.extra_args.clone());

        args
    }
}

/// Emulator launcher
pub struct EmulatorLauncher<'a, L: ProcessLauncher + ?Sized> {
    launcher: &'a L,
    emulator: String,
}

impl<'a, L: ProcessLauncher + ?Sized> EmulatorLauncher<'a, L> {
    pub fn new(launcher: &'a L, config: &EmulatorConfig) -> Self {
        Self {
            launcher,
            emulator: config.emulator.clone(),
        }
    }

    pub fn launch_command(&self, avd_name: &str, options: &EmulatorOptions) -> CommandSpec {
        CommandSpec::new(&self.emulator).args(options.to_args(avd_name))
    }

    /// Launch an emulator and return as soon as it is spawned.
    ///
    /// Does not wait for boot; callers that need a booted device poll for
    /// it themselves.
    pub async fn launch_detached(
        &self,
        avd_name: &str,
        options: &EmulatorOptions,
    ) -> Result<Option<u32>, ProcessError> {
        let cmd = self.launch_command(avd_name, options);
        info!("Launching emulator {}", avd_name);
        debug!("Emulator args: {:?}", cmd.args);

        let pid = self.launcher.spawn_detached(&cmd).await?;
        info!(pid = ?pid, "Emulator process started for {}", avd_name);

        Ok(pid)
    }
}
