//! Configuration
//!
//! Tunables for the lifecycle actions:
//! - Emulator tool names, image selection and launch sizing
//! - The termination routine used at teardown
//! - Log level

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LifecycleError, Result};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "CI_LIFECYCLE_CONFIG";

/// Emulator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmulatorConfig {
    /// avdmanager executable
    pub avdmanager: String,
    /// emulator executable
    pub emulator: String,
    /// System image variant (default, google_apis, ...)
    pub image_variant: String,
    /// System image ABI
    pub abi: String,
    /// GPU mode
    pub gpu: String,
    /// Feature flag passed with `-feature`
    pub feature: String,
    /// Guest RAM in MB
    pub memory_mb: u32,
    /// System/data partition size in MB
    pub partition_size_mb: u32,
    /// Cache partition size in MB
    pub cache_size_mb: u32,
    /// Log `emulator -list-avds` after creating the AVD
    pub list_avds: bool,
    /// Termination routine argv. Defaults to this binary's own
    /// `terminate-emulators` subcommand.
    pub termination_command: Option<Vec<String>>,
    /// Per-command timeout for the termination routine
    pub termination_timeout_secs: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            avdmanager: "avdmanager".to_string(),
            emulator: "emulator".to_string(),
            image_variant: "default".to_string(),
            abi: "x86".to_string(),
            gpu: "swiftshader_indirect".to_string(),
            feature: "GLESDynamicVersion".to_string(),
            memory_mb: 2048,
            partition_size_mb: 2048,
            cache_size_mb: 2048,
            list_avds: true,
            termination_command: None,
            termination_timeout_secs: 90,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter; `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LifecycleConfig {
    pub emulator: EmulatorConfig,
    pub logging: LoggingConfig,
}

impl LifecycleConfig {
    /// Parse from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: LifecycleConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LifecycleError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        debug!("Loading config from {:?}", path);
        let contents = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&contents)
    }

    /// Load from an explicit path, else from `CI_LIFECYCLE_CONFIG`, else defaults.
    pub async fn resolve(explicit: Option<&Path>, env_path: Option<PathBuf>) -> Result<Self> {
        match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load(&path).await,
            None => {
                info!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(command) = &self.emulator.termination_command {
            if command.is_empty() {
                return Err(LifecycleError::Config(
                    "emulator.termination_command must not be empty".into(),
                ));
            }
        }
        if self.emulator.termination_timeout_secs == 0 {
            return Err(LifecycleError::Config(
                "emulator.termination_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
