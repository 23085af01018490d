//! Record of what was last applied, used as the previous declaration when
//! the manifest is applied again.

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::toml;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MachineConfig;
use crate::files;
use crate::provider::ResourceId;

const STATE_SUFFIX: &str = "state.toml";

/// Errors raised while reading or writing applied state.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum StateError {
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the state file cannot be parsed or rendered.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path of the state file.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// The machine identity and the manifest it was last brought to.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AppliedState {
    /// Current identity of the managed machine.
    pub machine_id: ResourceId,
    /// Manifest as last applied to that machine.
    pub config: MachineConfig,
}

/// Storage for [`AppliedState`].
pub trait StateStore {
    /// Returns the stored state, or `None` when nothing has been applied.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the store exists but cannot be read.
    fn load(&self) -> Result<Option<AppliedState>, StateError>;

    /// Replaces the stored state.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the state cannot be written.
    fn save(&self, state: &AppliedState) -> Result<(), StateError>;

    /// Forgets the stored state.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the state cannot be removed.
    fn clear(&self) -> Result<(), StateError>;
}

/// A TOML state file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StateFile {
    path: Utf8PathBuf,
}

impl StateFile {
    /// Uses an explicit path.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Places the state next to a manifest: `machine.toml` is tracked in
    /// `machine.state.toml`.
    #[must_use]
    pub fn beside(manifest: &Utf8Path) -> Self {
        let stem = manifest.file_stem().unwrap_or("stevedore");
        Self::new(manifest.with_file_name(format!("{stem}.{STATE_SUFFIX}")))
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn io_error(&self, err: &std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }

    fn parse_error(&self, message: String) -> StateError {
        StateError::Parse {
            path: self.path.clone(),
            message,
        }
    }
}

impl StateStore for StateFile {
    fn load(&self) -> Result<Option<AppliedState>, StateError> {
        if !files::exists(&self.path).map_err(|err| self.io_error(&err))? {
            return Ok(None);
        }
        let contents = files::read(&self.path).map_err(|err| self.io_error(&err))?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        toml::from_str(&contents)
            .map(Some)
            .map_err(|err| self.parse_error(err.to_string()))
    }

    fn save(&self, state: &AppliedState) -> Result<(), StateError> {
        let rendered =
            toml::to_string_pretty(state).map_err(|err| self.parse_error(err.to_string()))?;
        files::write(&self.path, &rendered).map_err(|err| self.io_error(&err))
    }

    fn clear(&self) -> Result<(), StateError> {
        files::remove(&self.path).map_err(|err| self.io_error(&err))
    }
}
