//! Control plane connection settings layered via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::tracker::PollPolicy;

use super::ConfigError;
use super::change::Placement;

/// Provider endpoint, credentials, placement defaults and polling timings.
///
/// Values merge defaults, `stevedore.toml`, `STEVEDORE_*` environment
/// variables and CLI flags, in that order of precedence.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "STEVEDORE",
    discovery(
        app_name = "stevedore",
        env_var = "STEVEDORE_CONFIG_PATH",
        config_file_name = "stevedore.toml",
        dotfile_name = ".stevedore.toml",
        project_file_name = "stevedore.toml"
    )
)]
pub struct ProviderConfig {
    /// Base URL of the control plane API, without the region segment.
    pub api_url: String,
    /// Secret sent as `X-Auth-Token` on every request.
    pub secret_key: String,
    /// Project used when a manifest does not name one.
    pub default_project_id: String,
    /// Region used when a manifest does not name one.
    #[ortho_config(default = "fr-par".to_owned())]
    pub default_region: String,
    /// Seconds to wait before the first status query of an operation.
    #[ortho_config(default = 2)]
    pub poll_delay_secs: u64,
    /// Seconds between status queries.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Seconds an operation may take before the wait is abandoned.
    #[ortho_config(default = 600)]
    pub operation_timeout_secs: u64,
}

/// Where a setting can be supplied, for actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to stevedore.toml",
            self.description, self.env_var, self.toml_key
        ))
    }

    fn zero(&self) -> ConfigError {
        ConfigError::InvalidValue(format!(
            "{} must be greater than zero: check {} or {} in stevedore.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const API_URL: FieldMetadata =
    FieldMetadata::new("provider API URL", "STEVEDORE_API_URL", "api_url");
const SECRET_KEY: FieldMetadata =
    FieldMetadata::new("provider secret key", "STEVEDORE_SECRET_KEY", "secret_key");
const PROJECT_ID: FieldMetadata = FieldMetadata::new(
    "default project ID",
    "STEVEDORE_DEFAULT_PROJECT_ID",
    "default_project_id",
);
const REGION: FieldMetadata = FieldMetadata::new(
    "default region",
    "STEVEDORE_DEFAULT_REGION",
    "default_region",
);
const POLL_INTERVAL: FieldMetadata = FieldMetadata::new(
    "poll interval",
    "STEVEDORE_POLL_INTERVAL_SECS",
    "poll_interval_secs",
);
const OPERATION_TIMEOUT: FieldMetadata = FieldMetadata::new(
    "operation timeout",
    "STEVEDORE_OPERATION_TIMEOUT_SECS",
    "operation_timeout_secs",
);

fn require(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(metadata.missing());
    }
    Ok(())
}

impl ProviderConfig {
    /// Loads configuration without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when merging sources fails, including
    /// when a required value is absent from every source.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("stevedore")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks required values and polling timings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required value is blank
    /// and [`ConfigError::InvalidValue`] when the poll interval or the
    /// operation timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(&self.api_url, &API_URL)?;
        require(&self.secret_key, &SECRET_KEY)?;
        require(&self.default_project_id, &PROJECT_ID)?;
        require(&self.default_region, &REGION)?;
        if self.poll_interval_secs == 0 {
            return Err(POLL_INTERVAL.zero());
        }
        if self.operation_timeout_secs == 0 {
            return Err(OPERATION_TIMEOUT.zero());
        }
        Ok(())
    }

    /// Builds the tracker timings from the configured seconds.
    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(self.poll_delay_secs),
            Duration::from_secs(self.poll_interval_secs),
            Duration::from_secs(self.operation_timeout_secs),
        )
    }

    /// Placement applied to manifests that carry no override.
    #[must_use]
    pub fn default_placement(&self) -> Placement {
        Placement {
            project_id: self.default_project_id.clone(),
            region: self.default_region.clone(),
        }
    }
}
