//! Backup creation: submit, wait, then find out which backup was created.
//!
//! The service does not return the id of the backup it creates, so the
//! instance is listed before and after the submission and the new record is
//! resolved from the difference.

use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, error, info};

use super::{fetch_record, BackupReconciler};
use crate::clients::BackupApi;
use crate::error::{Error, Result};
use crate::identity::ResourceIdentity;
use crate::model::{
    BackupRecord, BackupSpec, BackupState, BackupStatus, CreationOutcome, Phase, Progress,
};
use crate::poller::poll;
use crate::snapshot::{diff, Snapshot};

/// Result of a successful creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedBackup {
    pub identity: ResourceIdentity,
    pub state: BackupState,
    pub record: BackupRecord,
}

impl<A: BackupApi + ?Sized> BackupReconciler<A> {
    /// Create a backup for `spec` and resolve its identity.
    ///
    /// Everything from the first listing to the resolved record counts
    /// against `create_timeout`.
    pub async fn create(&self, spec: &BackupSpec) -> Result<CreatedBackup> {
        let budget = self.config.create_timeout;
        let deadline = Instant::now() + budget;
        match timeout_at(deadline, self.create_until(spec, deadline)).await {
            Ok(result) => result,
            Err(_) => {
                error!(instance_id = %spec.instance_id, "Backup not created within {:?}", budget);
                Err(Error::PollTimeout { timeout: budget })
            }
        }
    }

    async fn create_until(&self, spec: &BackupSpec, deadline: Instant) -> Result<CreatedBackup> {
        let instance_id = spec.instance_id.as_str();
        info!(instance_id = %instance_id, "Creating backup");

        let before = self.snapshot(instance_id).await?;
        debug!(instance_id = %instance_id, count = before.len(), "Backups before creation");

        match self.api.create_backup(spec).await? {
            CreationOutcome::Async(handle) => {
                info!(instance_id = %instance_id, job_id = %handle.job_id, "Waiting for backup job");
                let api = self.api.as_ref();
                let job_id = handle.job_id.as_str();
                let settings = self.config.poll_settings(remaining(deadline));
                let task = poll("backup job", &settings, move || {
                    api.get_task_status(instance_id, job_id)
                })
                .await
                .inspect_err(|e| error!(job_id = %job_id, "Backup job did not finish: {}", e))?;
                debug!(job_id = %job_id, status = task.label(), "Backup job finished");
            }
            CreationOutcome::Synchronous(echo) => {
                if let Some(record) = echo.filter(|r| r.status == BackupStatus::Failed) {
                    return Err(Error::BackupFailed(format!(
                        "backup {} on instance {} reported status Failed",
                        record.id, instance_id
                    )));
                }
                debug!(instance_id = %instance_id, "Backup submitted synchronously, settling");
                sleep(self.config.settle_delay).await;
            }
        }

        let mut record = self.resolve(&before).await?;
        info!(instance_id = %instance_id, backup_id = %record.id, "Resolved new backup");

        match record.phase() {
            Phase::Failed => {
                return Err(Error::BackupFailed(format!(
                    "backup {} on instance {} reported status Failed",
                    record.id, instance_id
                )));
            }
            Phase::Pending => {
                record = self.wait_for_record(instance_id, &record.id, deadline).await?;
            }
            Phase::Succeeded => {}
        }

        let identity = ResourceIdentity::new(record.id.clone(), instance_id);
        let state = BackupState {
            id: identity.encode(),
            backup_id: record.id.clone(),
            backup_method: record.method.clone(),
            backup_type: record.backup_type.clone(),
        };
        info!(id = %state.id, "Backup created");

        Ok(CreatedBackup {
            identity,
            state,
            record,
        })
    }

    /// Re-list the instance until a new backup shows up, then require exactly one.
    async fn resolve(&self, before: &Snapshot) -> Result<BackupRecord> {
        let instance_id = before.instance_id.as_str();

        let mut after = self.snapshot(instance_id).await?;
        let mut new = diff(before, &after);
        let mut retries = 0;
        while new.is_empty() && retries < self.config.list_lag_retries {
            retries += 1;
            debug!(
                instance_id = %instance_id,
                retries,
                "New backup not listed yet, re-listing"
            );
            sleep(self.config.min_interval).await;
            after = self.snapshot(instance_id).await?;
            new = diff(before, &after);
        }

        if new.len() > 1 {
            let candidates: Vec<String> = new.into_iter().map(|r| r.id).collect();
            error!(instance_id = %instance_id, ?candidates, "Several new backups appeared");
            return Err(Error::AmbiguousResolution {
                instance_id: instance_id.to_string(),
                candidates,
            });
        }

        new.pop().ok_or_else(|| Error::ResolutionFailed {
            instance_id: instance_id.to_string(),
        })
    }

    /// Poll a resolved record's own status until it is `Success`.
    async fn wait_for_record(
        &self,
        instance_id: &str,
        backup_id: &str,
        deadline: Instant,
    ) -> Result<BackupRecord> {
        info!(backup_id = %backup_id, "Waiting for backup to become Success");
        let api = self.api.as_ref();
        let page_size = self.config.list_page_size;
        let settings = self.config.poll_settings(remaining(deadline));
        poll("backup", &settings, move || {
            fetch_record(api, instance_id, backup_id, page_size)
        })
        .await
    }
}

fn remaining(deadline: Instant) -> std::time::Duration {
    deadline.saturating_duration_since(Instant::now())
}
