//! Error types for volume reconciliation.

use thiserror::Error;

use crate::provider::{ProviderError, ResourceId, VolumeId};

use super::reconcile::ReconcileReport;

/// Raised when reconciliation stops part way. Operations completed before
/// the failure stay applied and are listed in [`ReconcileError::completed`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ReconcileError {
    /// Raised when a detach call or its operation fails.
    #[error("failed to detach volume {volume_id} from machine {machine_id}: {source}")]
    Detach {
        /// Machine the volume was being detached from.
        machine_id: ResourceId,
        /// Volume being detached.
        volume_id: VolumeId,
        /// Provider failure.
        #[source]
        source: ProviderError,
        /// Calls that finished before the failure.
        completed: Box<ReconcileReport>,
    },
    /// Raised when re-reading the attached volumes fails.
    #[error("failed to list volumes attached to machine {machine_id}: {source}")]
    ListVolumes {
        /// Machine whose volumes were listed.
        machine_id: ResourceId,
        /// Provider failure.
        #[source]
        source: ProviderError,
        /// Calls that finished before the failure.
        completed: Box<ReconcileReport>,
    },
    /// Raised when an attach call or its operation fails.
    #[error("failed to attach volume {volume_id} to machine {machine_id}: {source}")]
    Attach {
        /// Machine the volume was being attached to.
        machine_id: ResourceId,
        /// Volume being attached.
        volume_id: VolumeId,
        /// Provider failure.
        #[source]
        source: ProviderError,
        /// Calls that finished before the failure.
        completed: Box<ReconcileReport>,
    },
}

impl ReconcileError {
    /// Returns the provider failure that stopped reconciliation.
    #[must_use]
    pub const fn provider_error(&self) -> &ProviderError {
        match self {
            Self::Detach { source, .. }
            | Self::ListVolumes { source, .. }
            | Self::Attach { source, .. } => source,
        }
    }

    /// Returns the attach and detach calls that finished before the failure.
    #[must_use]
    pub fn completed(&self) -> &ReconcileReport {
        match self {
            Self::Detach { completed, .. }
            | Self::ListVolumes { completed, .. }
            | Self::Attach { completed, .. } => completed.as_ref(),
        }
    }

    pub(super) fn with_completed(mut self, report: ReconcileReport) -> Self {
        match &mut self {
            Self::Detach { completed, .. }
            | Self::ListVolumes { completed, .. }
            | Self::Attach { completed, .. } => **completed = report,
        }
        self
    }

    /// Returns the machine being reconciled.
    #[must_use]
    pub const fn machine_id(&self) -> &ResourceId {
        match self {
            Self::Detach { machine_id, .. }
            | Self::ListVolumes { machine_id, .. }
            | Self::Attach { machine_id, .. } => machine_id,
        }
    }
}
