//! Android Emulator Bridge
//!
//! Creates, boots and tears down Android emulators around a CI job.

pub mod action;
pub mod adb;
pub mod avd;
pub mod emulator;
pub mod process;
pub mod sdk;
pub mod terminate;
pub mod version;

pub use action::{EmulatorAction, AVD_NAME_OUTPUT, VERSION_INPUT};
pub use adb::{AdbClient, AdbError};
pub use avd::{avd_name, AvdManager, AvdSpec};
pub use emulator::{EmulatorLauncher, EmulatorOptions};
pub use process::{CommandOutput, CommandSpec, ProcessError, ProcessLauncher, TokioLauncher};
pub use sdk::{adb_home, sdk_root_from, sdk_root_from_env, ADB_HOME_VAR};
pub use terminate::{EmulatorTarget, EmulatorTerminator, TerminateError, TerminationReport};
pub use version::validate_version;
