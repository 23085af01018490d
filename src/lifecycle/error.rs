//! Error types for machine lifecycle transitions.

use thiserror::Error;

use crate::provider::{ProviderError, ResourceId};
use crate::volume::ReconcileError;

/// Errors raised while moving a machine between lifecycle states.
///
/// Provider failures are carried unchanged as the error source. Whatever
/// completed before the failure stays applied on the provider.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LifecycleError {
    /// Raised when the create call or its operation fails.
    #[error("failed to create machine: {0}")]
    Create(#[source] ProviderError),
    /// Raised when an operation finishes without naming any machine.
    #[error("operation {operation_id} finished without reporting a machine")]
    MissingResource {
        /// Handle of the operation.
        operation_id: String,
    },
    /// Raised when the resize call or its operation fails.
    #[error("failed to resize machine {machine_id}: {source}")]
    Resize {
        /// Machine being resized.
        machine_id: ResourceId,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },
    /// Raised when the synchronous field update fails.
    #[error("failed to update machine {machine_id}: {source}")]
    Update {
        /// Machine being updated.
        machine_id: ResourceId,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },
    /// Raised when volume reconciliation stops part way.
    #[error(transparent)]
    Volumes(#[from] ReconcileError),
    /// Raised when the delete call or its operation fails.
    #[error("failed to delete machine {machine_id}: {source}")]
    Delete {
        /// Machine being deleted.
        machine_id: ResourceId,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },
    /// Raised when reading a machine fails, including when it is gone.
    #[error("failed to read machine {machine_id}: {source}")]
    Read {
        /// Machine being read.
        machine_id: ResourceId,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },
    /// Raised when a deleted machine is still visible at the deadline.
    #[error("machine {machine_id} still present after deletion")]
    ResidualResource {
        /// Machine still visible.
        machine_id: ResourceId,
    },
    /// Raised when a field that cannot change in place differs.
    #[error("changing {field} requires replacing the machine")]
    ReplacementRequired {
        /// Name of the immutable field.
        field: String,
    },
}

impl LifecycleError {
    /// Returns the provider failure behind this error, if any.
    #[must_use]
    pub const fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Create(source)
            | Self::Resize { source, .. }
            | Self::Update { source, .. }
            | Self::Delete { source, .. }
            | Self::Read { source, .. } => Some(source),
            Self::Volumes(err) => Some(err.provider_error()),
            Self::MissingResource { .. }
            | Self::ResidualResource { .. }
            | Self::ReplacementRequired { .. } => None,
        }
    }

    /// Returns `true` when the provider reported the machine missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.provider_error()
            .is_some_and(ProviderError::is_not_found)
    }

    /// Identity of the machine the failed transition targeted, when one
    /// exists.
    #[must_use]
    pub const fn machine_id(&self) -> Option<&ResourceId> {
        match self {
            Self::Resize { machine_id, .. }
            | Self::Update { machine_id, .. }
            | Self::Delete { machine_id, .. }
            | Self::Read { machine_id, .. }
            | Self::ResidualResource { machine_id } => Some(machine_id),
            Self::Volumes(err) => Some(err.machine_id()),
            Self::Create(_) | Self::MissingResource { .. } | Self::ReplacementRequired { .. } => {
                None
            }
        }
    }
}
