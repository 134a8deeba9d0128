//! ci-lifecycle core - phase routing and shared types
//!
//! Every lifecycle action in this workspace runs twice per CI job step: a
//! setup run that allocates a resource and records how to find it, and a
//! teardown run that reclaims it. This crate holds the pieces both actions
//! share: the CI platform capability, the phase router and configuration.

pub mod config;
pub mod error;
pub mod phase;
pub mod platform;

pub use config::{EmulatorConfig, LifecycleConfig, LoggingConfig};
pub use error::{LifecycleError, Result};
pub use phase::{dispatch, LifecycleAction, Phase, PhaseOutcome, IS_POST_STATE};
pub use platform::{CiPlatform, GithubActionsPlatform, MemoryPlatform};

/// ci-lifecycle version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
