//! Read-only listing of an instance's backups with filters.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::clients::{list_all, BackupApi};
use crate::error::{Error, Result};
use crate::model::{BackupQuery, BackupRecord};

/// Flat projection of a backup record for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupSummary {
    pub id: String,
    pub host_instance_id: String,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub backup_type: String,
    pub backup_db_names: String,
    pub backup_download_url: String,
    pub backup_intranet_download_url: String,
    pub consistent_time: String,
    pub backup_location: String,
    pub backup_method: String,
    pub backup_mode: Option<String>,
    pub backup_scale: String,
    pub backup_size: u64,
    pub store_status: String,
}

impl From<&BackupRecord> for BackupSummary {
    fn from(r: &BackupRecord) -> Self {
        BackupSummary {
            id: r.id.clone(),
            host_instance_id: r.host_instance_id.clone(),
            status: r.status.as_str().to_string(),
            start_time: r.start_time,
            end_time: r.end_time,
            backup_type: r.backup_type.clone(),
            backup_db_names: r.db_names.clone(),
            backup_download_url: r.download_url.clone(),
            backup_intranet_download_url: r.intranet_download_url.clone(),
            consistent_time: r.consistent_time.clone(),
            backup_location: r.location.clone(),
            backup_method: r.method.clone(),
            backup_mode: r.mode.map(|m| m.as_str().to_string()),
            backup_scale: r.scale.clone(),
            backup_size: r.size_bytes,
            store_status: r.store_status.clone(),
        }
    }
}

/// Whether `record` satisfies every filter set on `query`.
///
/// Time filters bound the backup window: the backup must start at or after
/// `start_time` and end at or before `end_time`.
pub fn matches(query: &BackupQuery, record: &BackupRecord) -> bool {
    if let Some(id) = &query.backup_id {
        if &record.id != id {
            return false;
        }
    }
    if let Some(status) = query.status {
        if record.status != status {
            return false;
        }
    }
    if let Some(mode) = query.mode {
        if record.mode != Some(mode) {
            return false;
        }
    }
    if let Some(start) = query.start_time {
        if !record.start_time.is_some_and(|t| t >= start) {
            return false;
        }
    }
    if let Some(end) = query.end_time {
        if !record.end_time.is_some_and(|t| t <= end) {
            return false;
        }
    }
    true
}

/// List the backups matching `query`.
///
/// Filters are sent to the service and applied again locally, since the
/// service may ignore some of them.
pub async fn list_backups<A>(api: &A, query: &BackupQuery, page_size: u32) -> Result<Vec<BackupSummary>>
where
    A: BackupApi + ?Sized,
{
    let snapshot = list_all(api, query, page_size).await?;
    let listed = snapshot.len();

    let summaries: Vec<BackupSummary> = snapshot
        .records
        .iter()
        .filter(|r| matches(query, r))
        .map(BackupSummary::from)
        .collect();

    debug!(
        instance_id = %query.instance_id,
        listed,
        matched = summaries.len(),
        "Filtered backups"
    );
    Ok(summaries)
}

/// Write `backups` to `path` as pretty JSON, replacing any existing file.
pub fn write_output(path: &Path, backups: &[BackupSummary]) -> Result<()> {
    let output = |source: std::io::Error| Error::Output {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_vec_pretty(backups).map_err(|e| output(e.into()))?;
    std::fs::write(path, json).map_err(output)?;
    debug!(path = %path.display(), count = backups.len(), "Wrote backup listing");
    Ok(())
}
