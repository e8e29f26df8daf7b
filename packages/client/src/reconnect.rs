//! Reconnection policy.
//!
//! Pure decisions only; the runner owns the sleeping and the loop.

use std::time::Duration;

use crate::error::ClientError;

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_INTERVAL: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RECONNECT_ATTEMPTS,
            interval: RECONNECT_INTERVAL,
        }
    }
}

impl ReconnectPolicy {
    /// Check if the client should give up without retrying.
    ///
    /// A refused token stays refused, so retrying it only hammers the hub.
    pub fn should_exit_immediately(error: &ClientError) -> bool {
        matches!(error, ClientError::Unauthorized)
    }

    /// Check if another connection attempt should be made.
    ///
    /// # Arguments
    ///
    /// * `error` - The error that ended the previous attempt
    /// * `failed_attempts` - Consecutive failures so far (0-indexed)
    pub fn should_retry(&self, error: &ClientError, failed_attempts: u32) -> bool {
        if Self::should_exit_immediately(error) {
            return false;
        }
        failed_attempts < self.max_attempts
    }
}
