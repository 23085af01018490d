//! The declared machine manifest.

use std::collections::HashSet;

use camino::Utf8Path;
use ortho_config::toml;
use serde::{Deserialize, Serialize};

use crate::files;
use crate::provider::{MachineSpec, VolumeDescriptor};

use super::ConfigError;
use super::change::Placement;

/// Desired state of one machine, as written in a TOML manifest.
///
/// ```toml
/// name = "builder"
/// size_class = "DEV1-M"
/// image = "ubuntu-24-04"
/// tags = ["ci"]
///
/// [[volumes]]
/// id = "vol-cache"
/// name = "cache"
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MachineConfig {
    /// Machine name.
    pub name: String,
    /// Sizing class.
    pub size_class: String,
    /// Boot image.
    pub image: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Project override; falls back to the provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Region override; falls back to the provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Volumes that must be attached.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeDescriptor>,
}

impl MachineConfig {
    /// Reads and validates a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Manifest`] when the file cannot be read or
    /// parsed, and any error from [`Self::validate`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = files::read(path).map_err(|err| ConfigError::Manifest {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let manifest = Self::parse(&contents).map_err(|err| match err {
            ConfigError::Parse(message) => ConfigError::Manifest {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(manifest)
    }

    /// Parses and validates manifest text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and any error from
    /// [`Self::validate`].
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let manifest: Self =
            toml::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Checks required fields and that every volume is declared once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for blank required fields and
    /// [`ConfigError::DuplicateVolume`] for a repeated volume identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("name", &self.name),
            ("size_class", &self.size_class),
            ("image", &self.image),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "missing {key}: add {key} to the machine manifest"
                )));
            }
        }

        let mut seen = HashSet::with_capacity(self.volumes.len());
        for volume in &self.volumes {
            if volume.id.trim().is_empty() {
                return Err(ConfigError::MissingField(String::from(
                    "missing volume id: every [[volumes]] entry needs an id",
                )));
            }
            if !seen.insert(&volume.id) {
                return Err(ConfigError::DuplicateVolume {
                    volume_id: volume.id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolves the manifest overrides against provider defaults.
    #[must_use]
    pub fn placement(&self, defaults: &Placement) -> Placement {
        Placement {
            project_id: self
                .project_id
                .clone()
                .unwrap_or_else(|| defaults.project_id.clone()),
            region: self
                .region
                .clone()
                .unwrap_or_else(|| defaults.region.clone()),
        }
    }

    /// Builds the create request for this manifest.
    #[must_use]
    pub fn to_spec(&self, defaults: &Placement) -> MachineSpec {
        let Placement { project_id, region } = self.placement(defaults);
        MachineSpec {
            name: self.name.clone(),
            size_class: self.size_class.clone(),
            image: self.image.clone(),
            project_id,
            region,
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }
}
