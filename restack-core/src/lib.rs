//! restack-core: stack reconciliation engine.
//!
//! Reconciles a declarative infrastructure template against a remote
//! stack-management service: creates the stack when absent, updates it when
//! the template fingerprint changed, skips the remote call entirely when
//! unchanged, and polls the service until the operation reaches a terminal
//! status.
//!
//! # Example
//! ```ignore
//! use restack_core::{DeployConfig, HttpStackClient, StackReconciler};
//!
//! let client = HttpStackClient::new("http://[::1]:7070", "us-east-1");
//! let reconciler = StackReconciler::new(client, &DeployConfig::default());
//! let outcome = reconciler.reconcile("web-prod-resources", &template, None).await?;
//! ```

pub mod client;
pub mod config;
pub mod deploy;
pub mod error;
pub mod fingerprint;
pub mod poller;
pub mod reconciler;
pub mod test_util;

// Re-export commonly used types at crate root
pub use client::{HttpStackClient, Parameter, StackClient, StackDescription};
pub use config::DeployConfig;
pub use deploy::{DeployRunner, HostEnv};
pub use error::{Result, StackError};
pub use fingerprint::{canonical_json, fingerprint};
pub use poller::StatusPoller;
pub use reconciler::{Outcome, StackReconciler};
