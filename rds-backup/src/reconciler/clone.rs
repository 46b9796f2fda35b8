//! Restore of a backup, or a point in time, into a new instance.

use tracing::{error, info};

use super::BackupReconciler;
use crate::clients::BackupApi;
use crate::error::{Error, Result};
use crate::model::{CloneSpec, DbInstance};
use crate::poller::poll;

fn validate(spec: &CloneSpec) -> Result<()> {
    if spec.source_instance_id.trim().is_empty() {
        return Err(Error::InvalidCloneSpec("source instance id is empty".to_string()));
    }
    match (&spec.backup_id, &spec.restore_time) {
        (Some(backup_id), None) if !backup_id.trim().is_empty() => Ok(()),
        (Some(_), None) => Err(Error::InvalidCloneSpec("backup id is empty".to_string())),
        (None, Some(_)) => Ok(()),
        (Some(_), Some(_)) => Err(Error::InvalidCloneSpec(
            "both a backup id and a restore time were given".to_string(),
        )),
        (None, None) => Err(Error::InvalidCloneSpec(
            "one of backup id or restore time is required".to_string(),
        )),
    }
}

impl<A: BackupApi + ?Sized> BackupReconciler<A> {
    /// Restore into a new instance and wait until it is `Running`.
    pub async fn clone_instance(&self, spec: &CloneSpec) -> Result<DbInstance> {
        validate(spec)?;
        info!(
            source = %spec.source_instance_id,
            backup_id = ?spec.backup_id,
            restore_time = ?spec.restore_time,
            "Restoring into a new instance"
        );

        let instance_id = self.api.clone_instance(spec).await?;
        info!(instance_id = %instance_id, "Waiting for restored instance");

        let api = self.api.as_ref();
        let id = instance_id.as_str();
        let settings = self.config.poll_settings(self.config.clone_timeout);
        let instance = poll("restored instance", &settings, move || api.describe_instance(id))
            .await
            .inspect_err(|e| error!(instance_id = %instance_id, "Restore did not finish: {}", e))?;

        info!(instance_id = %instance.id, "Restored instance is running");
        Ok(instance)
    }
}
