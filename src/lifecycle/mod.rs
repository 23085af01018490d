//! Create, update, read and delete machines, with the volume declaration
//! kept in step.
//!
//! Every asynchronous write is awaited through the
//! [`OperationTracker`] before the next call is made, so a lifecycle method
//! never has two operations in flight.

mod error;

use std::fmt;

use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::config::{ConfigChange, Placement};
use crate::provider::{
    MachineFields, MachineSpec, MachineState, OperationHandle, ProviderClient, ResourceId,
    VolumeDescriptor,
};
use crate::tracker::{OperationTracker, PollPolicy};
use crate::volume::{ReconcileReport, VolumeReconciler};

pub use error::LifecycleError;

/// Lifecycle phase a machine is moving through.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Waiting for a create operation.
    Creating,
    /// Waiting for a resize operation.
    Resizing,
    /// Applying in-place field updates.
    Updating,
    /// Converging attached volumes.
    Reconciling,
    /// Waiting for a delete operation.
    Deleting,
}

impl Transition {
    /// Lowercase label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Resizing => "resizing",
            Self::Updating => "updating",
            Self::Reconciling => "reconciling",
            Self::Deleting => "deleting",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Drives machines through their lifecycle on one provider.
#[derive(Debug)]
pub struct MachineController<P> {
    client: P,
    policy: PollPolicy,
}

impl<P: ProviderClient> MachineController<P> {
    /// Creates a controller that awaits operations with `policy`.
    #[must_use]
    pub const fn new(client: P, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    /// Provider client in use.
    #[must_use]
    pub const fn client(&self) -> &P {
        &self.client
    }

    /// Polling policy in use.
    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Tracker bound to this controller's client and policy.
    #[must_use]
    pub const fn tracker(&self) -> OperationTracker<'_, P> {
        OperationTracker::new(&self.client, self.policy)
    }

    /// Volume reconciler bound to this controller's client and policy.
    #[must_use]
    pub const fn reconciler(&self) -> VolumeReconciler<'_, P> {
        VolumeReconciler::new(&self.client, self.policy)
    }

    /// Creates a machine, attaches `volumes` and reads it back.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Create`] when the create call or its operation
    ///   fails.
    /// - [`LifecycleError::MissingResource`] when the operation finishes
    ///   without naming a machine.
    /// - [`LifecycleError::Volumes`] when attaching fails; the machine
    ///   exists and the error carries its identity.
    /// - [`LifecycleError::Read`] when the read-back fails.
    pub async fn create(
        &self,
        spec: &MachineSpec,
        volumes: &[VolumeDescriptor],
    ) -> Result<MachineState, LifecycleError> {
        info!(phase = %Transition::Creating, name = %spec.name, size_class = %spec.size_class, "creating machine");
        let handle = self
            .client
            .create_machine(spec)
            .await
            .map_err(LifecycleError::Create)?;
        let resources = self
            .tracker()
            .await_completion(&handle)
            .await
            .map_err(LifecycleError::Create)?;
        let machine_id = first_resource(resources, &handle)?;
        info!(machine = %machine_id, "machine created");

        self.reconcile_volumes(&machine_id, &[], volumes).await?;
        self.read(&machine_id).await
    }

    /// Moves a machine to another sizing class and returns its identity
    /// afterwards, which may differ from `machine_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Resize`] when the call or its operation
    /// fails and [`LifecycleError::MissingResource`] when the operation
    /// names no machine.
    pub async fn resize(
        &self,
        machine_id: &ResourceId,
        size_class: &str,
    ) -> Result<ResourceId, LifecycleError> {
        info!(phase = %Transition::Resizing, machine = %machine_id, size_class, "resizing machine");
        let to_error = |source| LifecycleError::Resize {
            machine_id: machine_id.clone(),
            source,
        };
        let handle = self
            .client
            .resize_machine(machine_id, size_class)
            .await
            .map_err(to_error)?;
        let resources = self
            .tracker()
            .await_completion(&handle)
            .await
            .map_err(to_error)?;
        let resized = first_resource(resources, &handle)?;
        if resized != *machine_id {
            info!(previous = %machine_id, machine = %resized, "resize assigned a new identity");
        }
        Ok(resized)
    }

    /// Applies name, description and tag changes synchronously. Does
    /// nothing when `fields` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Update`] when the provider rejects the
    /// update.
    pub async fn update_fields(
        &self,
        machine_id: &ResourceId,
        fields: &MachineFields,
    ) -> Result<(), LifecycleError> {
        if fields.is_empty() {
            return Ok(());
        }
        info!(phase = %Transition::Updating, machine = %machine_id, "updating machine fields");
        self.client
            .update_machine_fields(machine_id, fields)
            .await
            .map_err(|source| LifecycleError::Update {
                machine_id: machine_id.clone(),
                source,
            })
    }

    /// Moves the machine's declared volumes from `old` to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Volumes`] when reconciliation stops.
    pub async fn reconcile_volumes(
        &self,
        machine_id: &ResourceId,
        old: &[VolumeDescriptor],
        new: &[VolumeDescriptor],
    ) -> Result<ReconcileReport, LifecycleError> {
        debug!(phase = %Transition::Reconciling, machine = %machine_id, "reconciling volumes");
        Ok(self.reconciler().reconcile(machine_id, old, new).await?)
    }

    /// Reads a machine.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Read`]; when the machine is gone the error
    /// answers `true` to [`LifecycleError::is_not_found`].
    pub async fn read(&self, machine_id: &ResourceId) -> Result<MachineState, LifecycleError> {
        self.client
            .get_machine(machine_id)
            .await
            .map_err(|source| LifecycleError::Read {
                machine_id: machine_id.clone(),
                source,
            })
    }

    /// Deletes a machine and waits until it can no longer be read. A
    /// machine that is already absent counts as deleted.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Delete`] when the call or its operation fails.
    /// - [`LifecycleError::Read`] when a read fails for another reason than
    ///   absence.
    /// - [`LifecycleError::ResidualResource`] when the machine is still
    ///   readable at the deadline.
    pub async fn delete(&self, machine_id: &ResourceId) -> Result<(), LifecycleError> {
        match self.read(machine_id).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                info!(machine = %machine_id, "machine already absent");
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        info!(phase = %Transition::Deleting, machine = %machine_id, "deleting machine");
        let to_error = |source| LifecycleError::Delete {
            machine_id: machine_id.clone(),
            source,
        };
        let handle = match self.client.delete_machine(machine_id).await {
            Ok(handle) => handle,
            Err(err) if err.is_not_found() => {
                info!(machine = %machine_id, "machine vanished before deletion");
                return Ok(());
            }
            Err(err) => return Err(to_error(err)),
        };
        self.tracker()
            .await_completion(&handle)
            .await
            .map_err(to_error)?;
        self.wait_until_gone(machine_id).await
    }

    async fn wait_until_gone(&self, machine_id: &ResourceId) -> Result<(), LifecycleError> {
        let deadline = Instant::now() + self.policy.timeout;
        loop {
            match self.read(machine_id).await {
                Ok(machine) => {
                    debug!(machine = %machine_id, status = %machine.status, "machine still visible after deletion");
                }
                Err(err) if err.is_not_found() => {
                    info!(machine = %machine_id, "machine deleted");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
            if Instant::now() + self.policy.min_interval > deadline {
                return Err(LifecycleError::ResidualResource {
                    machine_id: machine_id.clone(),
                });
            }
            sleep(self.policy.min_interval).await;
        }
    }

    /// Brings an existing machine from `change.old` to `change.new`.
    ///
    /// Steps run in a fixed order: resize, in-place field update, volume
    /// reconciliation, read-back. Steps whose inputs did not change are
    /// skipped. The resize may re-assign the machine's identity; later
    /// steps and the returned state use the new one.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ReplacementRequired`] before any provider
    /// call when an immutable field differs, and otherwise the error of the
    /// first failing step. Earlier steps stay applied.
    pub async fn apply(
        &self,
        machine_id: &ResourceId,
        change: ConfigChange<'_>,
        defaults: &Placement,
    ) -> Result<MachineState, LifecycleError> {
        if let Some(field) = change.replacement_fields(defaults).first() {
            return Err(LifecycleError::ReplacementRequired {
                field: (*field).to_owned(),
            });
        }

        let mut current = machine_id.clone();
        if change.size_class_changed() {
            current = self.resize(&current, &change.new.size_class).await?;
        }
        self.update_fields(&current, &change.field_updates()).await?;
        if change.volumes_changed() {
            self.reconcile_volumes(&current, &change.old.volumes, &change.new.volumes)
                .await?;
        }
        self.read(&current).await
    }
}

fn first_resource(
    resources: Vec<ResourceId>,
    handle: &OperationHandle,
) -> Result<ResourceId, LifecycleError> {
    resources
        .into_iter()
        .next()
        .ok_or_else(|| LifecycleError::MissingResource {
            operation_id: handle.to_string(),
        })
}
