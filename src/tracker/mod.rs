//! Turns an [`OperationHandle`] into a bounded-time, terminal result.
//!
//! The tracker polls at a fixed interval, without backoff. Abandoning the
//! wait (by timeout or by dropping the future) never cancels the operation
//! on the provider side; the target resource must then be treated as being
//! in an indeterminate state.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, warn};

use crate::provider::{
    OperationHandle, OperationStatus, ProviderClient, ProviderError, ResourceId,
};

/// Default wait before the first status query.
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(2);
/// Default spacing between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default overall deadline for one operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Timing parameters for [`OperationTracker::await_completion`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Wait before the first status query. Zero queries immediately.
    pub delay: Duration,
    /// Spacing between consecutive status queries.
    pub min_interval: Duration,
    /// Deadline covering the delay, every query and every sleep.
    pub timeout: Duration,
}

impl PollPolicy {
    /// Builds a policy from explicit durations.
    #[must_use]
    pub const fn new(delay: Duration, min_interval: Duration, timeout: Duration) -> Self {
        Self {
            delay,
            min_interval,
            timeout,
        }
    }

    /// Returns a copy with a different deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_POLL_DELAY,
            DEFAULT_POLL_INTERVAL,
            DEFAULT_OPERATION_TIMEOUT,
        )
    }
}

/// A provider client bound to one operation handle.
#[derive(Debug)]
pub struct StatusProbe<'a, P> {
    client: &'a P,
    handle: &'a OperationHandle,
}

impl<'a, P: ProviderClient> StatusProbe<'a, P> {
    /// Binds `client` to `handle`.
    #[must_use]
    pub const fn new(client: &'a P, handle: &'a OperationHandle) -> Self {
        Self { client, handle }
    }

    /// Handle this probe queries.
    #[must_use]
    pub const fn handle(&self) -> &OperationHandle {
        self.handle
    }

    /// Queries the current status once.
    ///
    /// # Errors
    ///
    /// Propagates whatever the provider returns for the status query.
    pub async fn poll(&self) -> Result<OperationStatus, ProviderError> {
        self.client.operation_status(self.handle).await
    }
}

/// Waits for provider operations to reach a terminal status.
#[derive(Debug)]
pub struct OperationTracker<'a, P> {
    client: &'a P,
    policy: PollPolicy,
}

impl<'a, P: ProviderClient> OperationTracker<'a, P> {
    /// Creates a tracker that polls through `client`.
    #[must_use]
    pub const fn new(client: &'a P, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    /// Policy in effect.
    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Polls `handle` until it finishes, fails, or the deadline passes.
    ///
    /// Returns the resource references carried by the `finished` status.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::OperationFailed`] with the provider's message when
    ///   the operation fails.
    /// - [`ProviderError::UnexpectedStatus`] when the provider reports a
    ///   status outside the known set.
    /// - [`ProviderError::OperationTimedOut`] when the deadline passes first.
    /// - Any error returned by the status query itself.
    pub async fn await_completion(
        &self,
        handle: &OperationHandle,
    ) -> Result<Vec<ResourceId>, ProviderError> {
        let deadline = Instant::now() + self.policy.timeout;
        let probe = StatusProbe::new(self.client, handle);

        if !self.policy.delay.is_zero() {
            sleep(capped(self.policy.delay, deadline)).await;
        }

        let mut polls: u32 = 0;
        while Instant::now() <= deadline {
            let Ok(result) = timeout_at(deadline, probe.poll()).await else {
                break;
            };
            polls = polls.saturating_add(1);
            let status = result?;
            debug!(
                operation = %handle,
                polls,
                status = status.label(),
                "polled operation status"
            );

            match status {
                OperationStatus::Pending | OperationStatus::InProgress => {}
                OperationStatus::Finished(resources) => return Ok(resources),
                OperationStatus::Failed(message) => {
                    return Err(ProviderError::OperationFailed {
                        operation_id: handle.to_string(),
                        message,
                    });
                }
                OperationStatus::Unrecognised(status) => {
                    return Err(ProviderError::UnexpectedStatus {
                        operation_id: handle.to_string(),
                        status,
                    });
                }
            }

            sleep(capped(self.policy.min_interval, deadline)).await;
        }

        warn!(
            operation = %handle,
            polls,
            timeout_secs = self.policy.timeout.as_secs(),
            "operation still running at deadline; it continues on the provider"
        );
        Err(ProviderError::OperationTimedOut {
            operation_id: handle.to_string(),
            timeout: self.policy.timeout,
        })
    }
}

fn capped(wait: Duration, deadline: Instant) -> Duration {
    wait.min(deadline.saturating_duration_since(Instant::now()))
}
