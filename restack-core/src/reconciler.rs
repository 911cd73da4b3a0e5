//! Create-or-update reconciliation of a template against a remote stack.
//!
//! One run is a strict sequential pipeline: attempt create, on a name
//! conflict describe and compare fingerprints, update only when the
//! template changed, and block on the poller after every mutation.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;

use crate::client::{Parameter, StackClient};
use crate::config::{DeployConfig, TEMPLATE_SHA_KEY};
use crate::error::{Result, StackError};
use crate::fingerprint::{canonical_json, fingerprint};
use crate::poller::StatusPoller;

/// Result of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stack did not exist and was created; holds the terminal status.
    Created(String),
    /// Stack existed with a different fingerprint and was updated; holds
    /// the terminal status.
    Updated(String),
    /// Stack already carries this template's fingerprint; nothing was sent.
    Unchanged,
    /// A precondition failed and the run never touched the remote service.
    /// Emitted by the deploy layer, never by the reconciler itself.
    Skipped(String),
}

/// Reconciles one template against one named stack through a
/// [`StackClient`].
///
/// The reconciler owns the run's lifecycle end to end but never the remote
/// stack, which is external mutable state it reads and writes only through
/// the client. Runs are independent; no state is kept across them.
pub struct StackReconciler<C: StackClient> {
    client: C,
    poller: StatusPoller,
}

impl<C: StackClient> StackReconciler<C> {
    pub fn new(client: C, config: &DeployConfig) -> Self {
        Self {
            poller: StatusPoller::new(config.poll_interval, config.terminal_markers.clone()),
            client,
        }
    }

    /// Access the wrapped client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one reconciliation and wait for the terminal status.
    ///
    /// Only the "already exists" conflict is recoverable; every other
    /// create/update/describe failure aborts the run and surfaces the
    /// underlying error unchanged. Mutations are never retried; only the
    /// status poll loops.
    pub async fn reconcile(
        &self,
        stack_name: &str,
        template: &Value,
        shutdown: Option<&mut mpsc::Receiver<()>>,
    ) -> Result<Outcome> {
        let digest = fingerprint(template);
        let body = canonical_json(template);
        let parameters = vec![Parameter::new(TEMPLATE_SHA_KEY, digest.clone())];
        info!(stack = %stack_name, fingerprint = %digest, "Reconciling stack");

        match self.client.create_stack(stack_name, &parameters, &body).await {
            Ok(()) => {
                info!(stack = %stack_name, "Stack created, waiting for terminal status");
                let status = self
                    .poller
                    .wait_until_terminal(&self.client, stack_name, shutdown)
                    .await?;
                Ok(Outcome::Created(status))
            }
            Err(StackError::AlreadyExists(_)) => {
                // Expected conflict: decide between no-op and update.
                let stack = match self.client.describe_stack(stack_name).await? {
                    Some(stack) => stack,
                    // Create reported a collision but describe finds
                    // nothing: an invariant violation, not a transient.
                    None => return Err(StackError::UnknownStack(stack_name.to_string())),
                };

                match stack.parameter(TEMPLATE_SHA_KEY) {
                    Some(stored) if stored == digest => {
                        info!(stack = %stack_name, "Template unchanged, skipping update");
                        Ok(Outcome::Unchanged)
                    }
                    _ => {
                        info!(stack = %stack_name, "Template changed, updating stack");
                        self.client
                            .update_stack(stack_name, &parameters, &body)
                            .await?;
                        let status = self
                            .poller
                            .wait_until_terminal(&self.client, stack_name, shutdown)
                            .await?;
                        Ok(Outcome::Updated(status))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }
}
