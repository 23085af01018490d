//! Converges the volumes attached to a machine on its declaration.

use tracing::{debug, info};

use crate::provider::{ProviderClient, ResourceId, VolumeDescriptor, VolumeId};
use crate::tracker::{OperationTracker, PollPolicy};

use super::diff::VolumePlan;
use super::error::ReconcileError;

/// What a reconciliation run did, in issue order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReconcileReport {
    /// Volumes detached.
    pub detached: Vec<VolumeId>,
    /// Volumes attached.
    pub attached: Vec<VolumeId>,
    /// Volumes slated for attachment but already attached.
    pub skipped: Vec<VolumeId>,
}

impl ReconcileReport {
    /// Returns `true` when no attach or detach call was issued.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.detached.is_empty() && self.attached.is_empty()
    }

    /// Declaration matching the machine after a run from `old` towards
    /// `new` that got as far as this report: `old` minus what was
    /// detached, plus the entries of `new` that were attached or found
    /// already attached.
    #[must_use]
    pub fn applied_declaration(
        &self,
        old: &[VolumeDescriptor],
        new: &[VolumeDescriptor],
    ) -> Vec<VolumeDescriptor> {
        let kept = old
            .iter()
            .filter(|volume| !self.detached.contains(&volume.id));
        let gained = new.iter().filter(|volume| {
            !old.iter().any(|previous| previous.id == volume.id)
                && (self.attached.contains(&volume.id) || self.skipped.contains(&volume.id))
        });
        kept.chain(gained).cloned().collect()
    }
}

/// Issues attach and detach calls one at a time, waiting for each to finish
/// before the next. All detaches complete before the first attach.
///
/// Volumes that were never declared (a boot disk, or anything attached
/// out of band) are never detached, because the plan is computed only over
/// declared identifiers.
#[derive(Debug)]
pub struct VolumeReconciler<'a, P> {
    client: &'a P,
    tracker: OperationTracker<'a, P>,
}

impl<'a, P: ProviderClient> VolumeReconciler<'a, P> {
    /// Creates a reconciler whose operations are awaited with `policy`.
    #[must_use]
    pub const fn new(client: &'a P, policy: PollPolicy) -> Self {
        Self {
            client,
            tracker: OperationTracker::new(client, policy),
        }
    }

    /// Moves `machine_id` from the `old` volume declaration to `new`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReconcileError`] met; nothing already applied is
    /// rolled back.
    pub async fn reconcile(
        &self,
        machine_id: &ResourceId,
        old: &[VolumeDescriptor],
        new: &[VolumeDescriptor],
    ) -> Result<ReconcileReport, ReconcileError> {
        let plan = VolumePlan::between(old, new);
        let mut report = ReconcileReport::default();
        if plan.is_empty() {
            debug!(machine = %machine_id, "declared volumes unchanged");
            return Ok(report);
        }

        for volume in &plan.to_detach {
            if let Err(err) = self.detach(machine_id, &volume.id).await {
                return Err(err.with_completed(report));
            }
            report.detached.push(volume.id.clone());
        }

        if plan.to_attach.is_empty() {
            return Ok(report);
        }

        let attached = match self.client.list_attached_volumes(machine_id).await {
            Ok(attached) => attached,
            Err(source) => {
                return Err(ReconcileError::ListVolumes {
                    machine_id: machine_id.clone(),
                    source,
                    completed: Box::new(report),
                });
            }
        };

        for volume in &plan.to_attach {
            if attached.iter().any(|current| current.id == volume.id) {
                info!(
                    machine = %machine_id,
                    volume = %volume.id,
                    "volume already attached; skipping"
                );
                report.skipped.push(volume.id.clone());
                continue;
            }
            if let Err(err) = self.attach(machine_id, volume).await {
                return Err(err.with_completed(report));
            }
            report.attached.push(volume.id.clone());
        }

        Ok(report)
    }

    /// Attaches a single volume and waits for the operation to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Attach`] when the call or its operation
    /// fails.
    pub async fn attach(
        &self,
        machine_id: &ResourceId,
        volume: &VolumeDescriptor,
    ) -> Result<(), ReconcileError> {
        info!(machine = %machine_id, volume = %volume.id, "attaching volume");
        let to_error = |source| ReconcileError::Attach {
            machine_id: machine_id.clone(),
            volume_id: volume.id.clone(),
            source,
            completed: Box::default(),
        };
        let handle = self
            .client
            .attach_volume(machine_id, volume)
            .await
            .map_err(to_error)?;
        self.tracker
            .await_completion(&handle)
            .await
            .map_err(to_error)?;
        Ok(())
    }

    /// Detaches a single volume and waits for the operation to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Detach`] when the call or its operation
    /// fails.
    pub async fn detach(
        &self,
        machine_id: &ResourceId,
        volume_id: &VolumeId,
    ) -> Result<(), ReconcileError> {
        info!(machine = %machine_id, volume = %volume_id, "detaching volume");
        let to_error = |source| ReconcileError::Detach {
            machine_id: machine_id.clone(),
            volume_id: volume_id.clone(),
            source,
            completed: Box::default(),
        };
        let handle = self
            .client
            .detach_volume(machine_id, volume_id)
            .await
            .map_err(to_error)?;
        self.tracker
            .await_completion(&handle)
            .await
            .map_err(to_error)?;
        Ok(())
    }
}
