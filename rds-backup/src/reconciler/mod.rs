//! Reconciler for backup resources.
//!
//! The reconciler drives the remote backup service towards the desired state
//! handed in by the configuration layer and reports the identity and state it
//! should persist.

mod clone;
mod create;
mod delete;
mod read;

pub use create::CreatedBackup;

use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::{list_all, BackupApi};
use crate::config::ReconcileConfig;
use crate::error::{ApiError, Result};
use crate::identity::ResourceIdentity;
use crate::model::{BackupQuery, BackupRecord, BackupSpec, BackupState};
use crate::snapshot::Snapshot;

/// Trait for resource reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// The desired state from the configuration layer.
    type Spec;
    /// The state to persist.
    type Status;

    /// Bring a new resource into existence and return its state.
    async fn reconcile(&self, spec: &Self::Spec) -> Result<Self::Status>;

    /// Refresh a resource by id; `None` means it is gone.
    async fn observe(&self, id: &str) -> Result<Option<Self::Status>>;

    /// Handle resource deletion (finalization).
    async fn finalize(&self, id: &str) -> Result<()>;
}

/// Fetch a single backup record through the list API.
async fn fetch_record<A: BackupApi + ?Sized>(
    api: &A,
    instance_id: &str,
    backup_id: &str,
    page_size: u32,
) -> std::result::Result<BackupRecord, ApiError> {
    let snapshot = list_all(api, &BackupQuery::backup(instance_id, backup_id), page_size).await?;
    snapshot
        .find(backup_id)
        .cloned()
        .ok_or_else(|| ApiError::BackupNotFound(backup_id.to_string()))
}

/// Backup reconciler that interacts with the remote backup service.
pub struct BackupReconciler<A: ?Sized> {
    api: Arc<A>,
    config: ReconcileConfig,
}

impl<A: BackupApi + ?Sized> BackupReconciler<A> {
    pub fn new(api: Arc<A>, config: ReconcileConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Full listing of an instance's backups.
    async fn snapshot(&self, instance_id: &str) -> std::result::Result<Snapshot, ApiError> {
        list_all(
            self.api.as_ref(),
            &BackupQuery::instance(instance_id),
            self.config.list_page_size,
        )
        .await
    }
}

#[async_trait]
impl<A: BackupApi + ?Sized> Reconciler for BackupReconciler<A> {
    type Spec = BackupSpec;
    type Status = BackupState;

    async fn reconcile(&self, spec: &Self::Spec) -> Result<Self::Status> {
        Ok(self.create(spec).await?.state)
    }

    async fn observe(&self, id: &str) -> Result<Option<Self::Status>> {
        let identity = ResourceIdentity::decode(id)?;
        Ok(self
            .read(&identity)
            .await?
            .map(|record| BackupState {
                id: identity.encode(),
                backup_id: record.id,
                backup_method: record.method,
                backup_type: record.backup_type,
            }))
    }

    async fn finalize(&self, id: &str) -> Result<()> {
        let identity = ResourceIdentity::decode(id)?;
        self.delete(&identity).await
    }
}
