//! JSON bodies exchanged with the control plane API.

use serde::{Deserialize, Serialize};

use crate::provider::{
    MachineSpec, MachineState, OperationHandle, OperationStatus, ResourceId, VolumeDescriptor,
};

/// Body of `POST /machines`.
#[derive(Debug, Serialize)]
pub(super) struct CreateMachineRequest<'a> {
    pub name: &'a str,
    pub size_class: &'a str,
    pub image: &'a str,
    pub project: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub tags: &'a [String],
}

impl<'a> From<&'a MachineSpec> for CreateMachineRequest<'a> {
    fn from(spec: &'a MachineSpec) -> Self {
        Self {
            name: &spec.name,
            size_class: &spec.size_class,
            image: &spec.image,
            project: &spec.project_id,
            description: spec.description.as_deref(),
            tags: &spec.tags,
        }
    }
}

/// Body of `POST /machines/{id}/resize`.
#[derive(Debug, Serialize)]
pub(super) struct ResizeRequest<'a> {
    pub size_class: &'a str,
}

/// Response of every call that starts an operation.
#[derive(Debug, Deserialize)]
pub(super) struct OperationStarted {
    operation: OperationRef,
}

#[derive(Debug, Deserialize)]
struct OperationRef {
    id: String,
}

impl From<OperationStarted> for OperationHandle {
    fn from(value: OperationStarted) -> Self {
        Self::new(value.operation.id)
    }
}

/// Response of `GET /operations/{id}`.
#[derive(Debug, Deserialize)]
pub(super) struct OperationReport {
    operation: OperationBody,
}

#[derive(Debug, Deserialize)]
struct OperationBody {
    status: String,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<OperationReport> for OperationStatus {
    fn from(value: OperationReport) -> Self {
        let OperationBody {
            status,
            resources,
            error,
        } = value.operation;
        Self::from_wire(
            &status,
            resources.into_iter().map(ResourceId::new).collect(),
            error,
        )
    }
}

/// A volume as reported by the API. Extra attributes are ignored.
#[derive(Debug, Deserialize)]
struct WireVolume {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<WireVolume> for VolumeDescriptor {
    fn from(value: WireVolume) -> Self {
        Self {
            id: value.id.into(),
            name: value.name,
            description: value.description,
        }
    }
}

/// Response of `GET /machines/{id}`.
#[derive(Debug, Deserialize)]
pub(super) struct MachineEnvelope {
    machine: WireMachine,
}

#[derive(Debug, Deserialize)]
struct WireMachine {
    id: String,
    name: String,
    size_class: String,
    image: String,
    status: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    volumes: Vec<WireVolume>,
}

impl From<MachineEnvelope> for MachineState {
    fn from(value: MachineEnvelope) -> Self {
        let machine = value.machine;
        Self {
            id: ResourceId::new(machine.id),
            name: machine.name,
            size_class: machine.size_class,
            image: machine.image,
            status: machine.status,
            description: machine.description,
            tags: machine.tags,
            volumes: machine.volumes.into_iter().map(VolumeDescriptor::from).collect(),
        }
    }
}

/// Response of `GET /machines/{id}/volumes`.
#[derive(Debug, Deserialize)]
pub(super) struct VolumeList {
    volumes: Vec<WireVolume>,
}

impl From<VolumeList> for Vec<VolumeDescriptor> {
    fn from(value: VolumeList) -> Self {
        value.volumes.into_iter().map(VolumeDescriptor::from).collect()
    }
}
