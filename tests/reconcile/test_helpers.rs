//! Shared fixtures for reconciliation BDD scenarios.

use std::cell::RefCell;
use std::time::Duration;

use rstest::fixture;
use stevedore::test_support::{ProviderCall, ScriptedProvider, machine_state};
use stevedore::{MachineController, MachineSpec, PollPolicy, ResourceId, VolumeDescriptor};

use crate::test_constants::{DEFAULT_PROJECT, DEFAULT_REGION, DEFAULT_SIZE_CLASS};

#[derive(Clone, Debug)]
pub enum StepOutcome {
    Success,
    Skipped(Vec<String>),
    Failure(String),
}

#[derive(Debug, Default)]
pub struct ReconcileContext {
    pub provider: ScriptedProvider,
    pub machine_id: RefCell<Option<ResourceId>>,
    pub old: RefCell<Vec<VolumeDescriptor>>,
    pub new: RefCell<Vec<VolumeDescriptor>>,
    pub outcome: RefCell<Option<StepOutcome>>,
}

impl ReconcileContext {
    pub fn controller(&self) -> MachineController<ScriptedProvider> {
        let policy = PollPolicy::new(
            Duration::ZERO,
            Duration::from_millis(1),
            Duration::from_secs(5),
        );
        MachineController::new(self.provider.clone(), policy)
    }

    pub fn seed(&self, machine_id: &str, volumes: Vec<VolumeDescriptor>) {
        self.provider
            .seed_machine(machine_state(machine_id, DEFAULT_SIZE_CLASS));
        self.provider.seed_volumes(machine_id, volumes);
        self.machine_id.replace(Some(ResourceId::from(machine_id)));
    }

    pub fn record(&self, outcome: StepOutcome) {
        self.outcome.replace(Some(outcome));
    }
}

#[fixture]
pub fn reconcile_context() -> ReconcileContext {
    ReconcileContext::default()
}

/// Parses a comma-separated list of volume identifiers.
pub fn volumes(list: &str) -> Vec<VolumeDescriptor> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(VolumeDescriptor::new)
        .collect()
}

pub fn spec() -> MachineSpec {
    MachineSpec {
        name: String::from("builder"),
        size_class: String::from(DEFAULT_SIZE_CLASS),
        image: String::from("ubuntu-24-04"),
        project_id: String::from(DEFAULT_PROJECT),
        region: String::from(DEFAULT_REGION),
        description: None,
        tags: Vec::new(),
    }
}

/// Renders attach and detach calls as `attach v1, detach v2`.
pub fn describe_volume_calls(calls: &[ProviderCall]) -> String {
    calls
        .iter()
        .filter_map(|call| match call {
            ProviderCall::Attach { volume_id, .. } => Some(format!("attach {volume_id}")),
            ProviderCall::Detach { volume_id, .. } => Some(format!("detach {volume_id}")),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}
