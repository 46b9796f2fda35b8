//! Tunables for the reconcilers.

use std::time::Duration;

use crate::poller::PollSettings;

/// Polling, retry and paging settings shared by every reconciler operation.
///
/// Built once at the boundary (CLI or embedding code) and handed to the
/// reconciler; nothing in the crate reads ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Delay before the first status fetch of a backup job.
    pub poll_interval: Duration,
    /// Spacing between subsequent fetches and list-lag retries.
    pub min_interval: Duration,
    /// Budget for a whole create, shared by all of its polling phases.
    pub create_timeout: Duration,
    /// Budget for a restored instance to become `Running`.
    pub clone_timeout: Duration,
    /// Budget for a delete to be observed through the list API.
    pub delete_budget: Duration,
    /// Wait between delete attempts.
    pub delete_retry_interval: Duration,
    /// Wait after a synchronous creation before re-listing.
    pub settle_delay: Duration,
    /// How many extra times to re-list while the new backup is not yet visible.
    pub list_lag_retries: u32,
    /// Page size for list calls.
    pub list_page_size: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            min_interval: Duration::from_secs(3),
            create_timeout: Duration::from_secs(10 * 60),
            clone_timeout: Duration::from_secs(30 * 60),
            delete_budget: Duration::from_secs(3 * 60),
            delete_retry_interval: Duration::from_secs(5),
            settle_delay: Duration::from_secs(5),
            list_lag_retries: 5,
            list_page_size: 100,
        }
    }
}

impl ReconcileConfig {
    /// Poll settings bounded by `timeout`.
    pub fn poll_settings(&self, timeout: Duration) -> PollSettings {
        PollSettings {
            delay: self.poll_interval,
            interval: self.min_interval,
            timeout,
        }
    }
}
