//! Error taxonomy shared by provider bindings and the orchestration layers.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a [`ProviderClient`](super::ProviderClient) or while
/// tracking one of its operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// Raised when the addressed resource does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// Description of the missing resource (for example `machine m-1`).
        resource: String,
    },
    /// Raised when an operation reaches the `failed` status.
    #[error("operation {operation_id} failed: {message}")]
    OperationFailed {
        /// Handle of the failed operation.
        operation_id: String,
        /// Failure message reported by the provider.
        message: String,
    },
    /// Raised when an operation is still running at the deadline. The
    /// provider-side operation keeps running.
    #[error("timed out after {}s waiting for operation {operation_id}", timeout.as_secs())]
    OperationTimedOut {
        /// Handle of the operation still in flight.
        operation_id: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },
    /// Raised when the provider reports a status this crate cannot interpret.
    #[error("operation {operation_id} reported unexpected status '{status}'")]
    UnexpectedStatus {
        /// Handle of the operation.
        operation_id: String,
        /// Raw status value.
        status: String,
    },
    /// Raised when the provider answers with a non-success status code.
    #[error("provider rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body returned by the provider.
        message: String,
    },
    /// Raised when the call fails before the provider answers, or the answer
    /// cannot be decoded.
    #[error("transport error: {message}")]
    Transport {
        /// Underlying error message.
        message: String,
    },
}

impl ProviderError {
    /// Builds a [`ProviderError::NotFound`] for a machine.
    #[must_use]
    pub fn machine_not_found(machine_id: &str) -> Self {
        Self::NotFound {
            resource: format!("machine {machine_id}"),
        }
    }

    /// Returns `true` for [`ProviderError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for [`ProviderError::OperationTimedOut`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::OperationTimedOut { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport {
            message: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(value: serde_json::Error) -> Self {
        Self::Transport {
            message: format!("malformed provider response: {value}"),
        }
    }
}
