//! Error types for the ZigZag environment layer.

use thiserror::Error;

/// Errors that can occur in the environment layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// Robot logic (or a misbehaving caller) tried to tamper with run state:
    /// re-binding the controller or assigning a second goal.
    #[error("Illegal action: {0}")]
    IllegalAction(String),

    /// A sensitive operation was denied by the sandbox policy.
    #[error("{capability} denied for {target}")]
    PermissionDenied {
        /// Kind of operation ("read", "write", "exec", ...)
        capability: String,
        /// Path, command, endpoint or symbol that was requested
        target: String,
    },

    /// Reading from or writing to a channel failed
    #[error("Channel error: {0}")]
    Channel(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates an illegal-action error.
    pub fn illegal(msg: impl Into<String>) -> Self {
        Self::IllegalAction(msg.into())
    }

    /// Creates a permission-denied error.
    pub fn denied(capability: impl Into<String>, target: impl std::fmt::Display) -> Self {
        Self::PermissionDenied {
            capability: capability.into(),
            target: target.to_string(),
        }
    }

    /// Creates a channel error from any displayable cause.
    pub fn channel(cause: impl std::fmt::Display) -> Self {
        Self::Channel(cause.to_string())
    }

    /// Returns true if this error came from the sandbox.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

impl From<std::io::Error> for EnvError {
    fn from(err: std::io::Error) -> Self {
        Self::channel(err)
    }
}
