//! Provider abstraction for an IaaS control plane with asynchronous writes.
//!
//! Every write except [`ProviderClient::update_machine_fields`] returns an
//! [`OperationHandle`]; callers hand it to the
//! [`OperationTracker`](crate::tracker::OperationTracker) to learn how the
//! write ended.

mod error;
mod status;
mod types;

use std::future::Future;
use std::pin::Pin;

pub use error::ProviderError;
pub use status::OperationStatus;
pub use types::{
    MachineFields, MachineSpec, MachineState, OperationHandle, ResourceId, VolumeDescriptor,
    VolumeId,
};

/// Future returned by provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Operations the orchestration layers need from a control plane client.
pub trait ProviderClient: Send + Sync {
    /// Starts creating a machine.
    fn create_machine<'a>(&'a self, spec: &'a MachineSpec) -> ProviderFuture<'a, OperationHandle>;

    /// Reads a machine. Must fail with [`ProviderError::NotFound`] when the
    /// machine does not exist.
    fn get_machine<'a>(&'a self, id: &'a ResourceId) -> ProviderFuture<'a, MachineState>;

    /// Starts moving a machine to another sizing class.
    fn resize_machine<'a>(
        &'a self,
        id: &'a ResourceId,
        size_class: &'a str,
    ) -> ProviderFuture<'a, OperationHandle>;

    /// Applies mutable fields synchronously.
    fn update_machine_fields<'a>(
        &'a self,
        id: &'a ResourceId,
        fields: &'a MachineFields,
    ) -> ProviderFuture<'a, ()>;

    /// Starts deleting a machine.
    fn delete_machine<'a>(&'a self, id: &'a ResourceId) -> ProviderFuture<'a, OperationHandle>;

    /// Starts attaching a volume to a machine.
    fn attach_volume<'a>(
        &'a self,
        machine_id: &'a ResourceId,
        volume: &'a VolumeDescriptor,
    ) -> ProviderFuture<'a, OperationHandle>;

    /// Starts detaching a volume from a machine.
    fn detach_volume<'a>(
        &'a self,
        machine_id: &'a ResourceId,
        volume_id: &'a VolumeId,
    ) -> ProviderFuture<'a, OperationHandle>;

    /// Lists the volumes currently attached to a machine.
    fn list_attached_volumes<'a>(
        &'a self,
        machine_id: &'a ResourceId,
    ) -> ProviderFuture<'a, Vec<VolumeDescriptor>>;

    /// Queries the status of an operation.
    fn operation_status<'a>(
        &'a self,
        handle: &'a OperationHandle,
    ) -> ProviderFuture<'a, OperationStatus>;
}
