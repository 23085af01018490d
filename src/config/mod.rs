//! Configuration: provider connection settings, machine manifests and
//! change detection between them.

mod change;
mod manifest;
mod provider;

use camino::Utf8PathBuf;
use thiserror::Error;

pub use change::{ConfigChange, Placement};
pub use manifest::MachineConfig;
pub use provider::ProviderConfig;

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field holds a value outside its accepted range.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
    /// Surfaces errors from the `ortho-config` loader or the TOML parser.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when a manifest file cannot be read or parsed.
    #[error("failed to load manifest {path}: {message}")]
    Manifest {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a manifest declares the same volume twice.
    #[error("volume {volume_id} is declared more than once")]
    DuplicateVolume {
        /// Repeated identifier.
        volume_id: String,
    },
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests;
