//! Newtypes and wire-neutral records shared by every provider binding.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

macro_rules! newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw provider identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the raw identifier.
            #[must_use]
            pub const fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

newtype!(
    /// Opaque token for an in-flight provider write operation.
    OperationHandle
);
newtype!(
    /// Provider-assigned identifier of a machine. Not stable across resizes.
    ResourceId
);
newtype!(
    /// Block-device identifier of a volume.
    VolumeId
);

/// A volume as declared in configuration or reported attached by the
/// provider.
///
/// Only [`VolumeDescriptor::id`] takes part in comparisons made by the
/// reconciler; the name and description are sent along with attach calls.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeDescriptor {
    /// Block-device identifier.
    pub id: VolumeId,
    /// Optional human-facing name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VolumeDescriptor {
    /// Builds a descriptor carrying only an identifier.
    #[must_use]
    pub fn new(id: impl Into<VolumeId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
        }
    }

    /// Sets the human-facing name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Everything the provider needs to create a machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineSpec {
    /// Machine name.
    pub name: String,
    /// Sizing class (for example `DEV1-M`).
    pub size_class: String,
    /// Boot image identifier or label.
    pub image: String,
    /// Project owning the machine.
    pub project_id: String,
    /// Region hosting the machine.
    pub region: String,
    /// Optional description.
    pub description: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

/// Mutable fields the provider applies synchronously, without an
/// operation handle. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MachineFields {
    /// New machine name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement tag list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl MachineFields {
    /// Returns `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.tags.is_none()
    }
}

/// Machine as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    /// Current identity.
    pub id: ResourceId,
    /// Machine name.
    pub name: String,
    /// Current sizing class.
    pub size_class: String,
    /// Boot image.
    pub image: String,
    /// Provider status string (for example `running`).
    pub status: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Tags currently set.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Volumes currently attached, including ones not managed here.
    #[serde(default)]
    pub volumes: Vec<VolumeDescriptor>,
}
