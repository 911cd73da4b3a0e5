//! Poll a stack's status until it reaches a terminal code.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::client::StackClient;
use crate::error::{Result, StackError};

/// Drives the describe/sleep loop for a single stack.
///
/// The loop is unbounded: no retry cap, no deadline, constant interval.
/// Callers that need a hard ceiling send on the shutdown channel or wrap
/// the future in a timeout of their own.
pub struct StatusPoller {
    interval: Duration,
    markers: Vec<String>,
}

impl StatusPoller {
    pub fn new(interval: Duration, markers: Vec<String>) -> Self {
        Self { interval, markers }
    }

    /// True when the status code contains any terminal marker.
    ///
    /// Case-sensitive substring containment, kept for compatibility with
    /// the provider's status vocabulary. This is an approximation, not an
    /// exact classifier: a longer status code that happens to contain a
    /// marker also counts as terminal.
    fn is_terminal(&self, status: &str) -> bool {
        self.markers.iter().any(|m| status.contains(m.as_str()))
    }

    /// Repeatedly describe `name` until a terminal status is observed, and
    /// return that status.
    ///
    /// A stack missing mid-poll is a hard error, not a transient one, and
    /// describe failures propagate immediately; only the not-yet-terminal
    /// case loops. `shutdown` (a message, or the sender closing) aborts the
    /// wait between polls.
    pub async fn wait_until_terminal<C: StackClient + ?Sized>(
        &self,
        client: &C,
        name: &str,
        shutdown: Option<&mut mpsc::Receiver<()>>,
    ) -> Result<String> {
        let mut shutdown = shutdown;
        loop {
            let stack = match client.describe_stack(name).await? {
                Some(stack) => stack,
                None => return Err(StackError::UnknownStack(name.to_string())),
            };

            info!(stack = %name, status = %stack.status, "Polled stack status");
            if self.is_terminal(&stack.status) {
                return Ok(stack.status);
            }

            match &mut shutdown {
                Some(rx) => {
                    tokio::select! {
                        _ = rx.recv() => {
                            info!(stack = %name, "Poll loop cancelled");
                            return Err(StackError::Aborted);
                        }
                        _ = tokio::time::sleep(self.interval) => {}
                    }
                }
                None => tokio::time::sleep(self.interval).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_terminal_markers;

    fn poller(markers: Vec<String>) -> StatusPoller {
        StatusPoller::new(Duration::from_millis(1), markers)
    }

    #[test]
    fn default_markers_classify_provider_statuses() {
        let p = poller(default_terminal_markers());
        assert!(p.is_terminal("CREATE_COMPLETE"));
        assert!(p.is_terminal("UPDATE_ROLLBACK_COMPLETE"));
        assert!(p.is_terminal("CREATE_FAILED"));
        assert!(!p.is_terminal("CREATE_IN_PROGRESS"));
        assert!(!p.is_terminal("REVIEW_PENDING"));
    }

    #[test]
    fn marker_match_is_case_sensitive() {
        let p = poller(default_terminal_markers());
        assert!(!p.is_terminal("create_complete"));
    }

    #[test]
    fn custom_markers_replace_defaults() {
        let p = poller(vec!["_DONE".to_string()]);
        assert!(p.is_terminal("APPLY_DONE"));
        assert!(!p.is_terminal("CREATE_COMPLETE"));
    }
}
