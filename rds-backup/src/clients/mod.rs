//! Clients for the remote backup service.
//!
//! The reconcilers only see the [`BackupApi`] trait:
//! - list: paged listing of an instance's backups
//! - create: backup submission, synchronous or job based
//! - task status: status of a submitted job
//! - delete: removal of one backup
//! - clone: restore of a backup or point in time into a new instance

pub mod rds;

pub use rds::RdsClient;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ApiError;
use crate::model::{
    BackupQuery, BackupRecord, BackupSpec, BackupTask, CloneSpec, CreationOutcome, DbInstance,
};
use crate::snapshot::Snapshot;

/// One page of a backup listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupPage {
    pub records: Vec<BackupRecord>,
    /// `None` when the service did not report a usable total.
    pub total_count: Option<u64>,
    /// 1-based.
    pub page_number: u32,
    pub page_size: u32,
}

impl BackupPage {
    /// Whether another page follows this one.
    ///
    /// A short or empty page is always the last. Without a total, a full
    /// page means the next one has to be fetched to find out.
    pub fn has_more(&self) -> bool {
        if self.records.is_empty() || (self.records.len() as u32) < self.page_size {
            return false;
        }
        match self.total_count {
            Some(total) => u64::from(self.page_number) * u64::from(self.page_size) < total,
            None => true,
        }
    }
}

/// The remote backup service.
#[async_trait]
pub trait BackupApi: Send + Sync {
    /// List one page of backups matching `query`.
    async fn list_backups(
        &self,
        query: &BackupQuery,
        page_number: u32,
        page_size: u32,
    ) -> Result<BackupPage, ApiError>;

    /// Submit a backup.
    async fn create_backup(&self, spec: &BackupSpec) -> Result<CreationOutcome, ApiError>;

    /// Current state of a submitted backup job.
    async fn get_task_status(&self, instance_id: &str, job_id: &str)
        -> Result<BackupTask, ApiError>;

    /// Delete one backup.
    async fn delete_backup(&self, instance_id: &str, backup_id: &str) -> Result<(), ApiError>;

    /// Start restoring into a new instance; returns the new instance id.
    async fn clone_instance(&self, spec: &CloneSpec) -> Result<String, ApiError>;

    /// Current description of an instance.
    async fn describe_instance(&self, instance_id: &str) -> Result<DbInstance, ApiError>;
}

/// List every backup matching `query`, following pagination.
pub async fn list_all<A>(api: &A, query: &BackupQuery, page_size: u32) -> Result<Snapshot, ApiError>
where
    A: BackupApi + ?Sized,
{
    let page_size = page_size.max(1);
    let mut records = Vec::new();
    let mut page_number = 1;

    loop {
        let page = api.list_backups(query, page_number, page_size).await?;
        debug!(
            instance_id = %query.instance_id,
            page_number,
            count = page.records.len(),
            total = ?page.total_count,
            "Listed backups page"
        );
        let more = page.has_more();
        records.extend(page.records);
        if !more {
            break;
        }
        page_number += 1;
    }

    Ok(Snapshot::new(query.instance_id.clone(), records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, page_number: u32, page_size: u32, total_count: Option<u64>) -> BackupPage {
        BackupPage {
            records: (0..n).map(|i| BackupRecord::new(i.to_string(), "i-1", Default::default())).collect(),
            total_count,
            page_number,
            page_size,
        }
    }

    #[test]
    fn short_page_is_last() {
        assert!(!page(3, 1, 10, Some(30)).has_more());
        assert!(!page(3, 1, 10, None).has_more());
    }

    #[test]
    fn full_page_with_more_records() {
        assert!(page(10, 1, 10, Some(25)).has_more());
        assert!(page(10, 2, 10, Some(25)).has_more());
        assert!(!page(10, 3, 10, Some(30)).has_more());
    }

    #[test]
    fn full_page_without_total_continues() {
        assert!(page(2, 1, 2, None).has_more());
        assert!(page(2, 7, 2, None).has_more());
    }

    #[test]
    fn empty_page_is_last() {
        assert!(!page(0, 1, 10, Some(100)).has_more());
        assert!(!page(0, 2, 10, None).has_more());
    }
}
