//! Phase Router
//!
//! A lifecycle action runs twice per job step: once as setup and once as
//! teardown. The only thing linking the two runs is the `isPost` flag in
//! cross-phase state, which setup saves before it does anything else.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::LifecycleError;
use crate::platform::CiPlatform;

/// State key marking that setup has run
pub const IS_POST_STATE: &str = "isPost";

/// Which half of the lifecycle the current invocation is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Teardown,
}

impl Phase {
    /// Any non-empty `isPost` value means setup already ran.
    pub fn detect(platform: &dyn CiPlatform) -> Self {
        if platform.get_state(IS_POST_STATE).is_empty() {
            Phase::Setup
        } else {
            Phase::Teardown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Teardown => "teardown",
        }
    }
}

/// A resource with a setup (provision) and teardown (reclaim) half.
#[async_trait]
pub trait LifecycleAction: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Allocate the resource and save whatever teardown needs to find it
    async fn setup(&self, platform: &dyn CiPlatform) -> anyhow::Result<()>;

    /// Release the resource using the state saved by setup
    async fn teardown(&self, platform: &dyn CiPlatform) -> anyhow::Result<()>;
}

/// Result of a dispatched invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub succeeded: bool,
}

/// Route to setup or teardown and convert any failure into a single
/// `set_failed` call on the platform.
pub async fn dispatch(action: &dyn LifecycleAction, platform: &dyn CiPlatform) -> PhaseOutcome {
    let phase = Phase::detect(platform);
    info!(action = action.name(), phase = phase.as_str(), "running lifecycle phase");

    let result = match phase {
        Phase::Setup => match platform.save_state(IS_POST_STATE, "true") {
            Ok(()) => action.setup(platform).await,
            Err(e) => Err(e.into()),
        },
        Phase::Teardown => action.teardown(platform).await,
    };

    match result {
        Ok(()) => {
            info!(action = action.name(), phase = phase.as_str(), "lifecycle phase completed");
            PhaseOutcome { phase, succeeded: true }
        }
        Err(err) => {
            let usage = err
                .downcast_ref::<LifecycleError>()
                .map(LifecycleError::is_usage_error)
                .unwrap_or(false);
            if usage {
                warn!(action = action.name(), phase = phase.as_str(), "rejected: {}", err);
            } else {
                error!(action = action.name(), phase = phase.as_str(), "failed: {:#}", err);
            }
            platform.set_failed(&err.to_string());
            PhaseOutcome { phase, succeeded: false }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct ProbeAction {
        calls: Mutex<Vec<&'static str>>,
        fail_with: Option<&'static str>,
    }

    #[async_trait]
    impl LifecycleAction for ProbeAction {
        fn name(&self) -> &'static str {
            "probe"
        }

        async fn setup(&self, _platform: &dyn CiPlatform) -> anyhow::Result<()> {
            self.calls.lock().push("setup");
            match self.fail_with {
                Some(msg) => Err(LifecycleError::InvalidArgument(msg.to_string()).into()),
                None => Ok(()),
            }
        }

        async fn teardown(&self, _platform: &dyn CiPlatform) -> anyhow::Result<()> {
            self.calls.lock().push("teardown");
            match self.fail_with {
                Some(msg) => Err(anyhow::anyhow!(msg)),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn test_detect_phase() {
        assert_eq!(Phase::detect(&MemoryPlatform::new()), Phase::Setup);
        assert_eq!(Phase::detect(&MemoryPlatform::new().with_state("isPost", "")), Phase::Setup);
        assert_eq!(
            Phase::detect(&MemoryPlatform::new().with_state("isPost", "true")),
            Phase::Teardown
        );
    }

    #[tokio::test]
    async fn test_setup_saves_flag_first() {
        let action = ProbeAction::default();
        let platform = MemoryPlatform::new();

        let outcome = dispatch(&action, &platform).await;

        assert_eq!(outcome, PhaseOutcome { phase: Phase::Setup, succeeded: true });
        assert_eq!(*action.calls.lock(), vec!["setup"]);
        assert_eq!(platform.saved_state()[0], ("isPost".to_string(), "true".to_string()));
        assert!(platform.failures().is_empty());

        let post = platform.next_phase();
        let outcome = dispatch(&action, &post).await;
        assert_eq!(outcome.phase, Phase::Teardown);
        assert_eq!(*action.calls.lock(), vec!["setup", "teardown"]);
    }

    #[tokio::test]
    async fn test_failure_reported_once_with_message() {
        let action = ProbeAction {
            fail_with: Some("version needs to be numeric but is x"),
            ..Default::default()
        };
        let platform = MemoryPlatform::new();

        let outcome = dispatch(&action, &platform).await;

        assert!(!outcome.succeeded);
        assert_eq!(platform.failures(), vec!["version needs to be numeric but is x"]);
        // flag is saved even though setup failed, so teardown still runs
        assert_eq!(platform.get_state("isPost"), "true");
    }

    #[tokio::test]
    async fn test_teardown_failure_reported() {
        let action = ProbeAction {
            fail_with: Some("gone"),
            ..Default::default()
        };
        let platform = MemoryPlatform::new().with_state("isPost", "true");

        let outcome = dispatch(&action, &platform).await;

        assert_eq!(outcome, PhaseOutcome { phase: Phase::Teardown, succeeded: false });
        assert_eq!(platform.failures(), vec!["gone"]);
    }
}
