//! Backup deletion, observed through the list API.

use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::BackupReconciler;
use crate::clients::BackupApi;
use crate::error::{Error, Result};
use crate::identity::ResourceIdentity;

impl<A: BackupApi + ?Sized> BackupReconciler<A> {
    /// Delete a backup and wait until the instance no longer lists it.
    ///
    /// A backup that is already absent counts as deleted, and the delete
    /// API is not called in that case.
    pub async fn delete(&self, identity: &ResourceIdentity) -> Result<()> {
        let ResourceIdentity {
            backup_id,
            instance_id,
        } = identity;
        info!(instance_id = %instance_id, backup_id = %backup_id, "Deleting backup");

        if !self.is_listed(instance_id, backup_id).await? {
            info!(backup_id = %backup_id, "Backup already absent");
            return Ok(());
        }

        let budget = self.config.delete_budget;
        match timeout(budget, self.delete_until_absent(instance_id, backup_id)).await {
            Ok(result) => result,
            Err(_) => {
                error!(backup_id = %backup_id, "Backup still listed after {:?}", budget);
                Err(Error::DeleteTimeout {
                    backup_id: backup_id.clone(),
                    budget,
                })
            }
        }
    }

    async fn delete_until_absent(&self, instance_id: &str, backup_id: &str) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.api.delete_backup(instance_id, backup_id).await {
                Ok(()) => debug!(backup_id = %backup_id, attempt, "Delete accepted"),
                Err(e) if e.is_not_found() => {
                    info!(backup_id = %backup_id, "Backup gone: {}", e);
                    return Ok(());
                }
                Err(e) => warn!(backup_id = %backup_id, attempt, "Delete failed, retrying: {}", e),
            }

            sleep(self.config.delete_retry_interval).await;

            if !self.is_listed(instance_id, backup_id).await? {
                info!(backup_id = %backup_id, attempt, "Backup deleted");
                return Ok(());
            }
        }
    }

    /// Whether the instance currently lists the backup.
    async fn is_listed(&self, instance_id: &str, backup_id: &str) -> Result<bool> {
        match self.snapshot(instance_id).await {
            Ok(snapshot) => Ok(snapshot.contains(backup_id)),
            Err(e) if e.is_not_found() => {
                debug!(instance_id = %instance_id, "Listing reports not found: {}", e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
