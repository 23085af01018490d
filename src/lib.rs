//! Core library for the Stevedore machine and volume manager.
//!
//! The crate drives an IaaS control plane whose writes complete
//! asynchronously: every call returns an operation handle that the
//! [`OperationTracker`] polls to a terminal status. On top of that sit the
//! [`VolumeReconciler`], which converges attached volumes on a declared set,
//! and the [`MachineController`], which creates, updates and deletes
//! machines. [`ApplyOrchestrator`] ties these to a TOML manifest and a
//! record of what was last applied.

pub mod apply;
pub mod config;
mod files;
pub mod http;
pub mod lifecycle;
pub mod provider;
pub mod state;
pub mod test_support;
pub mod tracker;
pub mod volume;

pub use apply::{ApplyError, ApplyOrchestrator, ApplyOutcome};
pub use config::{ConfigChange, ConfigError, MachineConfig, Placement, ProviderConfig};
pub use http::HttpProviderClient;
pub use lifecycle::{LifecycleError, MachineController, Transition};
pub use provider::{
    MachineFields, MachineSpec, MachineState, OperationHandle, OperationStatus, ProviderClient,
    ProviderError, ProviderFuture, ResourceId, VolumeDescriptor, VolumeId,
};
pub use state::{AppliedState, StateError, StateFile, StateStore};
pub use tracker::{OperationTracker, PollPolicy, StatusProbe};
pub use volume::{ReconcileError, ReconcileReport, VolumePlan, VolumeReconciler, diff_volumes};
