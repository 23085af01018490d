//! Create-or-update, destroy and inspect flows over a manifest and its
//! recorded state.

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigChange, ConfigError, MachineConfig, Placement};
use crate::lifecycle::{LifecycleError, MachineController};
use crate::provider::{MachineState, OperationHandle, ProviderClient, ProviderError, ResourceId};
use crate::state::{AppliedState, StateError, StateStore};

/// Errors raised by [`ApplyOrchestrator`].
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Raised when the manifest is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised when recorded state cannot be read or written.
    #[error(transparent)]
    State(#[from] StateError),
    /// Raised when a lifecycle transition fails.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// Raised when waiting on an operation fails.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Raised when an operation needs recorded state and there is none.
    #[error("no machine has been applied from this manifest yet")]
    NotApplied,
}

/// What [`ApplyOrchestrator::apply`] did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplyOutcome {
    /// A new machine was created.
    Created(MachineState),
    /// The recorded machine was brought up to date.
    Updated(MachineState),
}

impl ApplyOutcome {
    /// Machine as read back after the apply.
    #[must_use]
    pub const fn machine(&self) -> &MachineState {
        match self {
            Self::Created(machine) | Self::Updated(machine) => machine,
        }
    }
}

/// Drives a [`MachineController`] from a manifest, recording what was
/// applied in a [`StateStore`].
#[derive(Debug)]
pub struct ApplyOrchestrator<P, S> {
    controller: MachineController<P>,
    store: S,
    defaults: Placement,
}

impl<P: ProviderClient, S: StateStore> ApplyOrchestrator<P, S> {
    /// Combines a controller, a state store and placement defaults.
    #[must_use]
    pub const fn new(controller: MachineController<P>, store: S, defaults: Placement) -> Self {
        Self {
            controller,
            store,
            defaults,
        }
    }

    /// Controller in use.
    #[must_use]
    pub const fn controller(&self) -> &MachineController<P> {
        &self.controller
    }

    /// Creates the machine, or updates the recorded one, so it matches
    /// `manifest`.
    ///
    /// A recorded machine that no longer exists is forgotten and recreated.
    /// When a step fails after the provider already changed something, the
    /// state is updated to what was actually applied before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] for an invalid manifest, unreadable state, or
    /// a failed lifecycle step.
    pub async fn apply(&self, manifest: &MachineConfig) -> Result<ApplyOutcome, ApplyError> {
        manifest.validate()?;
        if let Some(state) = self.store.load()? {
            match self.controller.read(&state.machine_id).await {
                Ok(_) => return self.update(&state, manifest).await,
                Err(err) if err.is_not_found() => {
                    warn!(machine = %state.machine_id, "recorded machine no longer exists; recreating it");
                    self.store.clear()?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        self.create(manifest).await
    }

    async fn create(&self, manifest: &MachineConfig) -> Result<ApplyOutcome, ApplyError> {
        let spec = manifest.to_spec(&self.defaults);
        match self.controller.create(&spec, &manifest.volumes).await {
            Ok(machine) => {
                self.record(&machine.id, manifest.clone())?;
                Ok(ApplyOutcome::Created(machine))
            }
            Err(err) => {
                if let Some(machine_id) = err.machine_id() {
                    let mut applied = manifest.clone();
                    if let LifecycleError::Volumes(reconcile) = &err {
                        applied.volumes = reconcile
                            .completed()
                            .applied_declaration(&[], &manifest.volumes);
                    }
                    self.record(machine_id, applied)?;
                }
                Err(err.into())
            }
        }
    }

    async fn update(
        &self,
        state: &AppliedState,
        manifest: &MachineConfig,
    ) -> Result<ApplyOutcome, ApplyError> {
        let change = ConfigChange::new(&state.config, manifest);
        match self
            .controller
            .apply(&state.machine_id, change, &self.defaults)
            .await
        {
            Ok(machine) => {
                self.record(&machine.id, manifest.clone())?;
                Ok(ApplyOutcome::Updated(machine))
            }
            Err(err) => {
                if let Some(partial) = partially_applied(state, manifest, &err)
                    && partial != *state
                {
                    warn!(machine = %partial.machine_id, "apply stopped part way; recording the steps that completed");
                    self.store.save(&partial)?;
                }
                Err(err.into())
            }
        }
    }

    fn record(&self, machine_id: &ResourceId, config: MachineConfig) -> Result<(), StateError> {
        info!(machine = %machine_id, "recording applied state");
        self.store.save(&AppliedState {
            machine_id: machine_id.clone(),
            config,
        })
    }

    /// Deletes the recorded machine and forgets it. Returns the deleted
    /// identity, or `None` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when the state cannot be accessed or the
    /// deletion fails; the state is kept in that case.
    pub async fn destroy(&self) -> Result<Option<ResourceId>, ApplyError> {
        let Some(state) = self.store.load()? else {
            return Ok(None);
        };
        self.controller.delete(&state.machine_id).await?;
        self.store.clear()?;
        Ok(Some(state.machine_id))
    }

    /// Reads the recorded machine.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::NotApplied`] when nothing is recorded and
    /// [`ApplyError::Lifecycle`] when the read fails.
    pub async fn show(&self) -> Result<MachineState, ApplyError> {
        let state = self.store.load()?.ok_or(ApplyError::NotApplied)?;
        Ok(self.controller.read(&state.machine_id).await?)
    }

    /// Waits again on an operation whose earlier wait timed out. Returns
    /// the resources it reported.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Provider`] with the tracker's error.
    pub async fn wait(&self, handle: &OperationHandle) -> Result<Vec<ResourceId>, ApplyError> {
        Ok(self.controller.tracker().await_completion(handle).await?)
    }
}

/// State reflecting the steps of [`MachineController::apply`] that completed
/// before `err`, or `None` when nothing changed on the provider.
fn partially_applied(
    state: &AppliedState,
    manifest: &MachineConfig,
    err: &LifecycleError,
) -> Option<AppliedState> {
    let config = match err {
        LifecycleError::Update { .. } => MachineConfig {
            size_class: manifest.size_class.clone(),
            ..state.config.clone()
        },
        LifecycleError::Volumes(reconcile) => MachineConfig {
            volumes: reconcile
                .completed()
                .applied_declaration(&state.config.volumes, &manifest.volumes),
            ..manifest.clone()
        },
        LifecycleError::Read { .. } => manifest.clone(),
        _ => return None,
    };
    Some(AppliedState {
        machine_id: err.machine_id()?.clone(),
        config,
    })
}
