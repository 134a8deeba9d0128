//! ci-lifecycle - pre/post lifecycle helpers for CI jobs
//!
//! Each action runs twice in a job step. Setup provisions a resource and
//! records how to find it; teardown reclaims it.
//!
//! ## Actions
//!
//! - **emulator**: creates an Android Virtual Device for a platform version,
//!   boots it headless and stops every emulator at teardown
//! - **secret-file**: writes a text or base64 secret to disk and deletes it
//!   at teardown
//!
//! ## Architecture
//!
//! - `ci-lifecycle-core`: CI platform protocol, phase routing, configuration
//! - `ci-lifecycle-emulator-bridge`: AVD, emulator and adb tooling
//! - `ci-lifecycle-secret-file`: secret file storage

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;

pub use ci_lifecycle_core as core;
pub use ci_lifecycle_emulator_bridge as emulator;
pub use ci_lifecycle_secret_file as secret_file;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::commands::{EmulatorCommand, SecretFileCommand, TerminateEmulatorsCommand};
    pub use ci_lifecycle_core::{
        dispatch, CiPlatform, GithubActionsPlatform, LifecycleAction, LifecycleConfig, Phase,
        PhaseOutcome,
    };
    pub use ci_lifecycle_emulator_bridge::{EmulatorAction, EmulatorTerminator, TokioLauncher};
    pub use ci_lifecycle_secret_file::{FsSecretFiles, SecretFileAction, SecretType};
}
