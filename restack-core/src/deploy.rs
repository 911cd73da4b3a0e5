//! One-shot deployment runs: precondition checks, stack naming, and the
//! handoff to the reconciler.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::client::StackClient;
use crate::config::{stack_name, DeployConfig};
use crate::error::Result;
use crate::reconciler::{Outcome, StackReconciler};

/// Provider identifier this engine deploys against.
pub const SUPPORTED_PROVIDER: &str = "aws";

/// What the host deployment tool tells us about its environment.
///
/// A typed capability interface: the host answers explicit questions
/// instead of being probed for other plugins at runtime.
pub trait HostEnv {
    /// Provider identifier of the target environment, e.g. "aws".
    fn provider(&self) -> &str;

    /// Base deployment name; the stack name is derived from it.
    fn deployment_name(&self) -> &str;

    /// Whether the companion emulation tooling is active.
    fn emulation_tooling_active(&self) -> bool;
}

/// Runs a full deployment: validates preconditions, derives the stack name,
/// and hands off to the reconciler.
pub struct DeployRunner<C: StackClient> {
    reconciler: StackReconciler<C>,
    require_emulation: bool,
}

impl<C: StackClient> DeployRunner<C> {
    pub fn new(client: C, config: &DeployConfig) -> Self {
        Self {
            reconciler: StackReconciler::new(client, config),
            require_emulation: true,
        }
    }

    /// Disable the companion-tooling precondition.
    pub fn allow_without_emulation(mut self) -> Self {
        self.require_emulation = false;
        self
    }

    /// Access the wrapped client.
    pub fn client(&self) -> &C {
        self.reconciler.client()
    }

    /// Reason to skip the run, checked before any remote call.
    fn precondition_failure(&self, env: &dyn HostEnv, template: &Value) -> Option<String> {
        let empty = match template {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            return Some("template is missing or empty".to_string());
        }
        if env.provider() != SUPPORTED_PROVIDER {
            return Some(format!("unsupported provider: {}", env.provider()));
        }
        if self.require_emulation && !env.emulation_tooling_active() {
            return Some("companion emulation tooling is not active".to_string());
        }
        None
    }

    /// Run one deployment.
    ///
    /// Precondition failures are not errors: the run is skipped with a
    /// logged warning and reported as [`Outcome::Skipped`]. Everything past
    /// the checks behaves as documented on
    /// [`StackReconciler::reconcile`].
    pub async fn run(
        &self,
        env: &dyn HostEnv,
        template: &Value,
        shutdown: Option<&mut mpsc::Receiver<()>>,
    ) -> Result<Outcome> {
        if let Some(reason) = self.precondition_failure(env, template) {
            warn!(reason = %reason, "Skipping stack deployment");
            return Ok(Outcome::Skipped(reason));
        }

        let name = stack_name(env.deployment_name());
        info!(stack = %name, "Starting stack deployment");
        self.reconciler.reconcile(&name, template, shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockStackClient;
    use serde_json::json;

    struct TestHost {
        provider: &'static str,
        emulation: bool,
    }

    impl HostEnv for TestHost {
        fn provider(&self) -> &str {
            self.provider
        }

        fn deployment_name(&self) -> &str {
            "web-prod"
        }

        fn emulation_tooling_active(&self) -> bool {
            self.emulation
        }
    }

    fn runner() -> DeployRunner<MockStackClient> {
        DeployRunner::new(MockStackClient::new(), &DeployConfig::default())
    }

    #[test]
    fn empty_template_fails_precondition() {
        let host = TestHost { provider: "aws", emulation: true };
        let r = runner();
        assert!(r.precondition_failure(&host, &Value::Null).is_some());
        assert!(r.precondition_failure(&host, &json!({})).is_some());
        assert!(r.precondition_failure(&host, &json!({"Resources": {}})).is_none());
    }

    #[test]
    fn unsupported_provider_fails_precondition() {
        let host = TestHost { provider: "azure", emulation: true };
        let reason = runner()
            .precondition_failure(&host, &json!({"Resources": {}}))
            .unwrap();
        assert!(reason.contains("azure"));
    }

    #[test]
    fn missing_emulation_tooling_fails_unless_allowed() {
        let host = TestHost { provider: "aws", emulation: false };
        let template = json!({"Resources": {}});
        assert!(runner().precondition_failure(&host, &template).is_some());
        assert!(runner()
            .allow_without_emulation()
            .precondition_failure(&host, &template)
            .is_none());
    }
}
