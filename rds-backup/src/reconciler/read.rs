//! Refresh of a provisioned backup.

use tracing::{debug, info};

use super::{fetch_record, BackupReconciler};
use crate::clients::BackupApi;
use crate::error::Result;
use crate::identity::ResourceIdentity;
use crate::model::BackupRecord;

impl<A: BackupApi + ?Sized> BackupReconciler<A> {
    /// Current record for `identity`, or `None` when the backup or its
    /// instance no longer exists.
    pub async fn read(&self, identity: &ResourceIdentity) -> Result<Option<BackupRecord>> {
        debug!(id = %identity, "Reading backup");

        match fetch_record(
            self.api.as_ref(),
            &identity.instance_id,
            &identity.backup_id,
            self.config.list_page_size,
        )
        .await
        {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => {
                info!(id = %identity, "Backup is gone: {}", e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
