//! Test support utilities shared across unit and integration tests.
//!
//! [`ScriptedProvider`] is an in-memory control plane. Each write call gets
//! a fresh handle (`op-1`, `op-2`, ...) whose status sequence is taken from
//! the scripts queued for that kind of call, defaulting to an immediate
//! `finished`. When a handle reports `finished` its effect (create, resize,
//! delete, attach, detach) is applied to the in-memory machines. Detaching
//! a volume the machine does not carry fails with `NotFound`, as the
//! control plane answers 404.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::ready;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::provider::{
    MachineFields, MachineSpec, MachineState, OperationHandle, OperationStatus, ProviderClient,
    ProviderError, ProviderFuture, ResourceId, VolumeDescriptor, VolumeId,
};
use crate::state::{AppliedState, StateError, StateStore};

/// Kinds of provider calls, used to target scripts and injected failures.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CallKind {
    /// `create_machine`.
    Create,
    /// `get_machine`.
    Get,
    /// `resize_machine`.
    Resize,
    /// `update_machine_fields`.
    Update,
    /// `delete_machine`.
    Delete,
    /// `attach_volume`.
    Attach,
    /// `detach_volume`.
    Detach,
    /// `list_attached_volumes`.
    ListVolumes,
    /// `operation_status`.
    Status,
}

/// A provider call recorded by [`ScriptedProvider`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProviderCall {
    /// A create call with the requested machine name.
    Create {
        /// Requested name.
        name: String,
    },
    /// A read of a machine.
    Get(ResourceId),
    /// A resize call.
    Resize {
        /// Machine resized.
        machine_id: ResourceId,
        /// Requested sizing class.
        size_class: String,
    },
    /// A synchronous field update.
    Update {
        /// Machine updated.
        machine_id: ResourceId,
        /// Fields sent.
        fields: MachineFields,
    },
    /// A delete call.
    Delete(ResourceId),
    /// An attach call.
    Attach {
        /// Target machine.
        machine_id: ResourceId,
        /// Volume attached.
        volume_id: VolumeId,
    },
    /// A detach call.
    Detach {
        /// Target machine.
        machine_id: ResourceId,
        /// Volume detached.
        volume_id: VolumeId,
    },
    /// A listing of attached volumes.
    ListVolumes(ResourceId),
    /// A status query.
    Status(OperationHandle),
}

impl ProviderCall {
    /// Returns the kind of this call.
    #[must_use]
    pub const fn kind(&self) -> CallKind {
        match self {
            Self::Create { .. } => CallKind::Create,
            Self::Get(_) => CallKind::Get,
            Self::Resize { .. } => CallKind::Resize,
            Self::Update { .. } => CallKind::Update,
            Self::Delete(_) => CallKind::Delete,
            Self::Attach { .. } => CallKind::Attach,
            Self::Detach { .. } => CallKind::Detach,
            Self::ListVolumes(_) => CallKind::ListVolumes,
            Self::Status(_) => CallKind::Status,
        }
    }
}

type StatusResult = Result<OperationStatus, ProviderError>;

#[derive(Clone, Debug)]
enum Effect {
    Create(MachineSpec),
    Resize {
        machine_id: ResourceId,
        size_class: String,
    },
    Delete(ResourceId),
    Attach {
        machine_id: ResourceId,
        volume: VolumeDescriptor,
    },
    Detach {
        machine_id: ResourceId,
        volume_id: VolumeId,
    },
}

#[derive(Debug, Default)]
struct ScriptState {
    calls: Vec<ProviderCall>,
    scripts: HashMap<CallKind, VecDeque<Vec<StatusResult>>>,
    failures: HashMap<CallKind, VecDeque<ProviderError>>,
    queued: HashMap<OperationHandle, VecDeque<StatusResult>>,
    last: HashMap<OperationHandle, StatusResult>,
    effects: HashMap<OperationHandle, Effect>,
    machines: HashMap<ResourceId, MachineState>,
    lingering: HashSet<ResourceId>,
    next_operation: u32,
    next_machine: u32,
}

impl ScriptState {
    fn take_failure(&mut self, kind: CallKind) -> Option<ProviderError> {
        self.failures.get_mut(&kind).and_then(VecDeque::pop_front)
    }

    fn start_operation(&mut self, kind: CallKind, effect: Effect) -> OperationHandle {
        self.next_operation = self.next_operation.saturating_add(1);
        let handle = OperationHandle::new(format!("op-{}", self.next_operation));
        let scripted = self.scripts.get_mut(&kind).and_then(VecDeque::pop_front);
        let script = match scripted {
            Some(script) => script,
            None => vec![Ok(OperationStatus::Finished(
                self.default_resources(&effect),
            ))],
        };
        self.queued.insert(handle.clone(), script.into_iter().collect());
        self.effects.insert(handle.clone(), effect);
        handle
    }

    fn default_resources(&mut self, effect: &Effect) -> Vec<ResourceId> {
        match effect {
            Effect::Create(_) => {
                self.next_machine = self.next_machine.saturating_add(1);
                vec![ResourceId::new(format!("m-{}", self.next_machine))]
            }
            Effect::Resize { machine_id, .. } => vec![machine_id.clone()],
            Effect::Delete(_) | Effect::Attach { .. } | Effect::Detach { .. } => Vec::new(),
        }
    }

    fn next_status(&mut self, handle: &OperationHandle) -> StatusResult {
        let next = self
            .queued
            .get_mut(handle)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.last.get(handle).cloned())
            .unwrap_or_else(|| {
                Err(ProviderError::NotFound {
                    resource: format!("operation {handle}"),
                })
            });
        self.last.insert(handle.clone(), next.clone());
        if let Ok(OperationStatus::Finished(resources)) = &next
            && let Some(effect) = self.effects.remove(handle)
        {
            self.apply(effect, resources);
        }
        next
    }

    fn apply(&mut self, effect: Effect, resources: &[ResourceId]) {
        match effect {
            Effect::Create(spec) => {
                if let Some(id) = resources.first() {
                    self.machines.insert(id.clone(), machine_from_spec(id.clone(), &spec));
                }
            }
            Effect::Resize {
                machine_id,
                size_class,
            } => {
                if let Some(mut machine) = self.machines.remove(&machine_id) {
                    let new_id = resources.first().cloned().unwrap_or(machine_id);
                    machine.id = new_id.clone();
                    machine.size_class = size_class;
                    self.machines.insert(new_id, machine);
                }
            }
            Effect::Delete(machine_id) => {
                if !self.lingering.contains(&machine_id) {
                    self.machines.remove(&machine_id);
                }
            }
            Effect::Attach { machine_id, volume } => {
                if let Some(machine) = self.machines.get_mut(&machine_id) {
                    machine.volumes.push(volume);
                }
            }
            Effect::Detach {
                machine_id,
                volume_id,
            } => {
                if let Some(machine) = self.machines.get_mut(&machine_id) {
                    machine.volumes.retain(|volume| volume.id != volume_id);
                }
            }
        }
    }

    fn machine(&self, id: &ResourceId) -> Result<&MachineState, ProviderError> {
        self.machines
            .get(id)
            .ok_or_else(|| ProviderError::machine_not_found(id))
    }
}

fn machine_from_spec(id: ResourceId, spec: &MachineSpec) -> MachineState {
    MachineState {
        id,
        name: spec.name.clone(),
        size_class: spec.size_class.clone(),
        image: spec.image.clone(),
        status: String::from("running"),
        description: spec.description.clone(),
        tags: spec.tags.clone(),
        volumes: Vec::new(),
    }
}

/// Builds a running machine with no volumes, for seeding a
/// [`ScriptedProvider`].
#[must_use]
pub fn machine_state(id: &str, size_class: &str) -> MachineState {
    MachineState {
        id: ResourceId::from(id),
        name: format!("{id}-name"),
        size_class: size_class.to_owned(),
        image: String::from("ubuntu-24-04"),
        status: String::from("running"),
        description: None,
        tags: Vec::new(),
        volumes: Vec::new(),
    }
}

/// In-memory [`ProviderClient`] with scripted operation outcomes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedProvider {
    /// Creates a provider with no machines and no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a machine as if it already existed on the provider.
    pub fn seed_machine(&self, machine: MachineState) {
        self.state().machines.insert(machine.id.clone(), machine);
    }

    /// Replaces the volumes reported attached to a seeded machine.
    pub fn seed_volumes(&self, machine_id: &str, volumes: Vec<VolumeDescriptor>) {
        if let Some(machine) = self.state().machines.get_mut(&ResourceId::from(machine_id)) {
            machine.volumes = volumes;
        }
    }

    /// Keeps a machine readable after its deletion finishes.
    pub fn linger(&self, machine_id: &str) {
        self.state().lingering.insert(ResourceId::from(machine_id));
    }

    /// Queues the status sequence served to the next operation of `kind`.
    /// The final status repeats once the sequence is exhausted.
    pub fn script_next(&self, kind: CallKind, statuses: Vec<OperationStatus>) {
        self.script_next_results(kind, statuses.into_iter().map(Ok).collect());
    }

    /// Like [`Self::script_next`] but allows failing status queries.
    pub fn script_next_results(&self, kind: CallKind, statuses: Vec<StatusResult>) {
        self.state()
            .scripts
            .entry(kind)
            .or_default()
            .push_back(statuses);
    }

    /// Scripts the status sequence of an explicit handle with no effect.
    pub fn script_handle(&self, handle: &str, statuses: Vec<OperationStatus>) {
        self.state().queued.insert(
            OperationHandle::from(handle),
            statuses.into_iter().map(Ok).collect(),
        );
    }

    /// Makes the next call of `kind` fail with `error` before it takes
    /// effect.
    pub fn fail_next(&self, kind: CallKind, error: ProviderError) {
        self.state()
            .failures
            .entry(kind)
            .or_default()
            .push_back(error);
    }

    /// Returns every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state().calls.clone()
    }

    /// Returns the recorded calls of one kind, in order.
    #[must_use]
    pub fn calls_of(&self, kind: CallKind) -> Vec<ProviderCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.kind() == kind)
            .cloned()
            .collect()
    }

    /// Returns attach and detach calls only, in order.
    #[must_use]
    pub fn volume_calls(&self) -> Vec<ProviderCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call.kind(), CallKind::Attach | CallKind::Detach))
            .cloned()
            .collect()
    }

    /// Counts status queries made for `handle`.
    #[must_use]
    pub fn status_polls(&self, handle: &str) -> usize {
        let target = OperationHandle::from(handle);
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, ProviderCall::Status(polled) if *polled == target))
            .count()
    }

    /// Returns the machine as currently held in memory.
    #[must_use]
    pub fn machine(&self, id: &str) -> Option<MachineState> {
        self.state().machines.get(&ResourceId::from(id)).cloned()
    }

    fn write_call(
        &self,
        call: ProviderCall,
        effect: Effect,
    ) -> Result<OperationHandle, ProviderError> {
        let mut state = self.state();
        let kind = call.kind();
        state.calls.push(call);
        if let Some(error) = state.take_failure(kind) {
            return Err(error);
        }
        Ok(state.start_operation(kind, effect))
    }
}

impl ProviderClient for ScriptedProvider {
    fn create_machine<'a>(&'a self, spec: &'a MachineSpec) -> ProviderFuture<'a, OperationHandle> {
        let result = self.write_call(
            ProviderCall::Create {
                name: spec.name.clone(),
            },
            Effect::Create(spec.clone()),
        );
        Box::pin(ready(result))
    }

    fn get_machine<'a>(&'a self, id: &'a ResourceId) -> ProviderFuture<'a, MachineState> {
        let mut state = self.state();
        state.calls.push(ProviderCall::Get(id.clone()));
        let result = match state.take_failure(CallKind::Get) {
            Some(error) => Err(error),
            None => state.machine(id).cloned(),
        };
        Box::pin(ready(result))
    }

    fn resize_machine<'a>(
        &'a self,
        id: &'a ResourceId,
        size_class: &'a str,
    ) -> ProviderFuture<'a, OperationHandle> {
        let result = self.write_call(
            ProviderCall::Resize {
                machine_id: id.clone(),
                size_class: size_class.to_owned(),
            },
            Effect::Resize {
                machine_id: id.clone(),
                size_class: size_class.to_owned(),
            },
        );
        Box::pin(ready(result))
    }

    fn update_machine_fields<'a>(
        &'a self,
        id: &'a ResourceId,
        fields: &'a MachineFields,
    ) -> ProviderFuture<'a, ()> {
        let mut state = self.state();
        state.calls.push(ProviderCall::Update {
            machine_id: id.clone(),
            fields: fields.clone(),
        });
        let result = if let Some(error) = state.take_failure(CallKind::Update) {
            Err(error)
        } else {
            match state.machines.get_mut(id) {
                Some(machine) => {
                    if let Some(name) = &fields.name {
                        machine.name.clone_from(name);
                    }
                    if let Some(description) = &fields.description {
                        machine.description = Some(description.clone());
                    }
                    if let Some(tags) = &fields.tags {
                        machine.tags.clone_from(tags);
                    }
                    Ok(())
                }
                None => Err(ProviderError::machine_not_found(id)),
            }
        };
        Box::pin(ready(result))
    }

    fn delete_machine<'a>(&'a self, id: &'a ResourceId) -> ProviderFuture<'a, OperationHandle> {
        let result = self.write_call(ProviderCall::Delete(id.clone()), Effect::Delete(id.clone()));
        Box::pin(ready(result))
    }

    fn attach_volume<'a>(
        &'a self,
        machine_id: &'a ResourceId,
        volume: &'a VolumeDescriptor,
    ) -> ProviderFuture<'a, OperationHandle> {
        let result = self.write_call(
            ProviderCall::Attach {
                machine_id: machine_id.clone(),
                volume_id: volume.id.clone(),
            },
            Effect::Attach {
                machine_id: machine_id.clone(),
                volume: volume.clone(),
            },
        );
        Box::pin(ready(result))
    }

    fn detach_volume<'a>(
        &'a self,
        machine_id: &'a ResourceId,
        volume_id: &'a VolumeId,
    ) -> ProviderFuture<'a, OperationHandle> {
        let mut state = self.state();
        state.calls.push(ProviderCall::Detach {
            machine_id: machine_id.clone(),
            volume_id: volume_id.clone(),
        });
        let result = if let Some(error) = state.take_failure(CallKind::Detach) {
            Err(error)
        } else {
            let attached = state
                .machine(machine_id)
                .map(|machine| machine.volumes.iter().any(|volume| volume.id == *volume_id));
            match attached {
                Ok(true) => Ok(state.start_operation(
                    CallKind::Detach,
                    Effect::Detach {
                        machine_id: machine_id.clone(),
                        volume_id: volume_id.clone(),
                    },
                )),
                Ok(false) => Err(ProviderError::NotFound {
                    resource: format!("volume {volume_id} on machine {machine_id}"),
                }),
                Err(err) => Err(err),
            }
        };
        Box::pin(ready(result))
    }

    fn list_attached_volumes<'a>(
        &'a self,
        machine_id: &'a ResourceId,
    ) -> ProviderFuture<'a, Vec<VolumeDescriptor>> {
        let mut state = self.state();
        state.calls.push(ProviderCall::ListVolumes(machine_id.clone()));
        let result = match state.take_failure(CallKind::ListVolumes) {
            Some(error) => Err(error),
            None => state.machine(machine_id).map(|machine| machine.volumes.clone()),
        };
        Box::pin(ready(result))
    }

    fn operation_status<'a>(
        &'a self,
        handle: &'a OperationHandle,
    ) -> ProviderFuture<'a, OperationStatus> {
        let mut state = self.state();
        state.calls.push(ProviderCall::Status(handle.clone()));
        let result = match state.take_failure(CallKind::Status) {
            Some(error) => Err(error),
            None => state.next_status(handle),
        };
        Box::pin(ready(result))
    }
}

/// In-memory [`StateStore`] for orchestration tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    current: Option<AppliedState>,
    saves: u32,
    clears: u32,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `state`.
    #[must_use]
    pub fn with_state(state: AppliedState) -> Self {
        let store = Self::default();
        store.lock().current = Some(state);
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the stored state.
    #[must_use]
    pub fn current(&self) -> Option<AppliedState> {
        self.lock().current.clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> u32 {
        self.lock().saves
    }

    /// Number of clears.
    #[must_use]
    pub fn clears(&self) -> u32 {
        self.lock().clears
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<AppliedState>, StateError> {
        Ok(self.lock().current.clone())
    }

    fn save(&self, state: &AppliedState) -> Result<(), StateError> {
        let mut inner = self.lock();
        inner.current = Some(state.clone());
        inner.saves = inner.saves.saturating_add(1);
        Ok(())
    }

    fn clear(&self) -> Result<(), StateError> {
        let mut inner = self.lock();
        inner.current = None;
        inner.clears = inner.clears.saturating_add(1);
        Ok(())
    }
}
