//! Operation status values reported while an asynchronous write runs.

use super::types::ResourceId;

const PENDING: &str = "pending";
const IN_PROGRESS: &str = "in_progress";
const FINISHED: &str = "finished";
const FAILED: &str = "failed";

/// Status of an asynchronous provider operation at one poll.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OperationStatus {
    /// Accepted but not started.
    Pending,
    /// Running.
    InProgress,
    /// Completed; carries the resources the operation produced or touched.
    Finished(Vec<ResourceId>),
    /// Completed unsuccessfully; carries the provider's message.
    Failed(String),
    /// A status value this crate does not know about.
    Unrecognised(String),
}

impl OperationStatus {
    /// Maps a raw status string and its payload onto a variant.
    ///
    /// Unknown values are kept as [`OperationStatus::Unrecognised`] rather
    /// than rejected so the caller decides how to fail.
    #[must_use]
    pub fn from_wire(raw: &str, resources: Vec<ResourceId>, error: Option<String>) -> Self {
        match raw {
            PENDING => Self::Pending,
            IN_PROGRESS => Self::InProgress,
            FINISHED => Self::Finished(resources),
            FAILED => Self::Failed(error.unwrap_or_default()),
            other => Self::Unrecognised(other.to_owned()),
        }
    }

    /// Returns `true` once polling must stop.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::InProgress)
    }

    /// Short label used in log lines.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => PENDING,
            Self::InProgress => IN_PROGRESS,
            Self::Finished(_) => FINISHED,
            Self::Failed(_) => FAILED,
            Self::Unrecognised(raw) => raw.as_str(),
        }
    }
}
