//! Stack service client contract.
//!
//! The reconciler only talks to the remote service through [`StackClient`];
//! everything behind it (transport, auth, wire format) is opaque to the
//! engine.

mod http;

pub use http::HttpStackClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A key/value parameter attached to a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Current remote state of a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDescription {
    pub name: String,
    /// Opaque provider status code, e.g. "CREATE_IN_PROGRESS".
    pub status: String,
    pub parameters: Vec<Parameter>,
}

impl StackDescription {
    /// Look up a parameter value by key.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

/// Client for the remote stack-management service.
///
/// All three operations are plain awaits with no implicit timeout; timeout
/// policy belongs to the transport behind the implementation.
#[async_trait]
pub trait StackClient: Send + Sync {
    /// Create a new stack. Fails with [`crate::StackError::AlreadyExists`]
    /// when the name is taken.
    async fn create_stack(
        &self,
        name: &str,
        parameters: &[Parameter],
        template_body: &str,
    ) -> Result<()>;

    /// Replace an existing stack's template and parameters.
    async fn update_stack(
        &self,
        name: &str,
        parameters: &[Parameter],
        template_body: &str,
    ) -> Result<()>;

    /// Fetch the current state of a stack, or `None` if it does not exist.
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>>;
}
