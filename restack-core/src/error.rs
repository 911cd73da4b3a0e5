//! Engine error types.

use thiserror::Error;

/// Errors surfaced by stack reconciliation.
#[derive(Debug, Error)]
pub enum StackError {
    /// Create targeted a name that is already taken. Recoverable: this
    /// drives the describe/update branch and is never surfaced to callers.
    #[error("stack already exists: {0}")]
    AlreadyExists(String),

    /// A stack that must exist could not be found: describe came back empty
    /// right after a create conflict, or the stack vanished mid-poll.
    #[error("unknown stack: {0}")]
    UnknownStack(String),

    /// The run was cancelled through the shutdown signal.
    #[error("reconciliation aborted")]
    Aborted,

    /// Any other remote failure, passed through unmodified.
    #[error("remote operation failed: {0}")]
    Remote(#[from] anyhow::Error),
}

/// Result type for stack operations.
pub type Result<T> = std::result::Result<T, StackError>;
