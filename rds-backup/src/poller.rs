//! Bounded polling of backup jobs and records to a terminal status.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::error::{ApiError, Error, Result};
use crate::model::{Phase, Progress};

/// Cadence and budget of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait before the first fetch.
    pub delay: Duration,
    /// Wait between fetches.
    pub interval: Duration,
    /// Budget for the whole poll, fetches included.
    pub timeout: Duration,
}

/// Fetch `what` until it reaches a terminal phase.
///
/// Returns the terminal value on success. A `Failed` status ends the poll
/// with [`Error::BackupFailed`]; an error from `fetch` ends it unchanged;
/// running out of budget yields [`Error::PollTimeout`].
pub async fn poll<T, F, Fut>(what: &str, settings: &PollSettings, fetch: F) -> Result<T>
where
    T: Progress,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, ApiError>>,
{
    match timeout(settings.timeout, drive(what, settings, fetch)).await {
        Ok(result) => result,
        Err(_) => Err(Error::PollTimeout {
            timeout: settings.timeout,
        }),
    }
}

async fn drive<T, F, Fut>(what: &str, settings: &PollSettings, mut fetch: F) -> Result<T>
where
    T: Progress,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, ApiError>>,
{
    sleep(settings.delay).await;

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let current = fetch().await?;

        match current.phase() {
            Phase::Succeeded => {
                debug!(attempt, status = current.label(), "{} finished", what);
                return Ok(current);
            }
            Phase::Failed => {
                return Err(Error::BackupFailed(format!(
                    "{} reported status {}",
                    what,
                    current.label()
                )));
            }
            Phase::Pending => {
                debug!(attempt, status = current.label(), "{} still in progress", what);
                sleep(settings.interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackupStatus, TaskStatus};
    use std::collections::VecDeque;
    use tokio::time::Instant;

    fn settings() -> PollSettings {
        PollSettings {
            delay: Duration::from_secs(5),
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(60),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_finished_job_status() {
        let mut script = VecDeque::from([
            TaskStatus::Preparing,
            TaskStatus::Uploading,
            TaskStatus::Finished,
        ]);
        let mut calls = 0;

        let status = poll("job", &settings(), || {
            calls += 1;
            let next = script.pop_front().unwrap_or(TaskStatus::Unknown);
            async move { Ok(next) }
        })
        .await
        .unwrap();

        assert_eq!(status, TaskStatus::Finished);
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_successful_record_status() {
        let mut script = VecDeque::from([BackupStatus::Creating, BackupStatus::Success]);

        let status = poll("backup", &settings(), || {
            let next = script.pop_front().unwrap_or(BackupStatus::Unknown);
            async move { Ok(next) }
        })
        .await
        .unwrap();

        assert_eq!(status, BackupStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_stops_without_further_fetches() {
        let mut script = VecDeque::from([
            TaskStatus::Waiting,
            TaskStatus::Failed,
            TaskStatus::Finished,
        ]);
        let mut calls = 0;

        let err = poll("job", &settings(), || {
            calls += 1;
            let next = script.pop_front().unwrap_or(TaskStatus::Unknown);
            async move { Ok(next) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::BackupFailed(ref msg) if msg.contains("Failed")));
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_never_terminal() {
        let start = Instant::now();
        let err = poll("job", &settings(), || async { Ok(TaskStatus::Checking) })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PollTimeout { timeout } if timeout == Duration::from_secs(60)));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_on_hanging_fetch() {
        let err = poll("job", &settings(), || {
            std::future::pending::<std::result::Result<TaskStatus, ApiError>>()
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::PollTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_aborts_immediately() {
        let mut script: VecDeque<std::result::Result<TaskStatus, ApiError>> = VecDeque::from([
            Ok(TaskStatus::Preparing),
            Err(ApiError::Transport("connection reset".into())),
            Ok(TaskStatus::Finished),
        ]);
        let mut calls = 0;

        let err = poll("job", &settings(), || {
            calls += 1;
            let next = script.pop_front().unwrap();
            async move { next }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::Transport(_))));
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_delay_then_interval() {
        let mut script = VecDeque::from([
            TaskStatus::NoStart,
            TaskStatus::Checking,
            TaskStatus::Finished,
        ]);
        let start = Instant::now();
        let mut seen = Vec::new();

        poll("job", &settings(), || {
            seen.push(start.elapsed());
            let next = script.pop_front().unwrap_or(TaskStatus::Unknown);
            async move { Ok(next) }
        })
        .await
        .unwrap();

        assert_eq!(
            seen,
            vec![
                Duration::from_secs(5),
                Duration::from_secs(8),
                Duration::from_secs(11),
            ]
        );
    }
}
