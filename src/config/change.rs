//! Change detection between the applied and the declared manifest.

use serde::{Deserialize, Serialize};

use crate::provider::MachineFields;
use crate::volume::VolumePlan;

use super::manifest::MachineConfig;

/// Project and region a machine lives in.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Placement {
    /// Owning project.
    pub project_id: String,
    /// Hosting region.
    pub region: String,
}

/// The previously applied manifest paired with the newly declared one.
#[derive(Clone, Copy, Debug)]
pub struct ConfigChange<'a> {
    /// Manifest as last applied.
    pub old: &'a MachineConfig,
    /// Manifest as now declared.
    pub new: &'a MachineConfig,
}

impl<'a> ConfigChange<'a> {
    /// Pairs two manifests.
    #[must_use]
    pub const fn new(old: &'a MachineConfig, new: &'a MachineConfig) -> Self {
        Self { old, new }
    }

    /// Returns `true` when the sizing class differs.
    #[must_use]
    pub fn size_class_changed(&self) -> bool {
        self.old.size_class != self.new.size_class
    }

    /// Fields that differ and can be updated in place. A removed
    /// description is sent as an empty string.
    #[must_use]
    pub fn field_updates(&self) -> MachineFields {
        let mut fields = MachineFields::default();
        if self.old.name != self.new.name {
            fields.name = Some(self.new.name.clone());
        }
        if self.old.description != self.new.description {
            fields.description = Some(self.new.description.clone().unwrap_or_default());
        }
        if self.old.tags != self.new.tags {
            fields.tags = Some(self.new.tags.clone());
        }
        fields
    }

    /// Returns `true` when the name, description or tags differ.
    #[must_use]
    pub fn fields_changed(&self) -> bool {
        !self.field_updates().is_empty()
    }

    /// Returns `true` when the declared volume identifiers differ.
    /// Metadata-only edits do not count.
    #[must_use]
    pub fn volumes_changed(&self) -> bool {
        !VolumePlan::between(&self.old.volumes, &self.new.volumes).is_empty()
    }

    /// Names of changed fields that cannot be updated without replacing the
    /// machine, with placement resolved against `defaults`.
    #[must_use]
    pub fn replacement_fields(&self, defaults: &Placement) -> Vec<&'static str> {
        let old = self.old.placement(defaults);
        let new = self.new.placement(defaults);
        let mut fields = Vec::new();
        if self.old.image != self.new.image {
            fields.push("image");
        }
        if old.project_id != new.project_id {
            fields.push("project_id");
        }
        if old.region != new.region {
            fields.push("region");
        }
        fields
    }

    /// Returns `true` when applying the change would make no provider call.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.size_class_changed() && !self.fields_changed() && !self.volumes_changed()
    }
}
