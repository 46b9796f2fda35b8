//! Typed view of the remote backup service's records and jobs.
//!
//! Field names on the wire follow the service's PascalCase JSON. Records and
//! tasks are owned by the service; everything here is a read-only copy.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Minute-precision form the list API uses alongside RFC 3339.
const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// Parse a service timestamp; blank or unrecognized values are absent.
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, MINUTE_FORMAT)
                .ok()
                .map(|t| t.and_utc())
        })
}

fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_time))
}

/// Where a backup or backup job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Still in progress, keep polling.
    Pending,
    /// Terminal success.
    Succeeded,
    /// Terminal failure, never retried.
    Failed,
}

/// Anything whose status can be polled to a terminal phase.
pub trait Progress {
    fn phase(&self) -> Phase;

    /// The raw status as the service spells it.
    fn label(&self) -> &str;
}

/// Status of a backup record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackupStatus {
    Creating,
    Success,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl BackupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStatus::Creating => "Creating",
            BackupStatus::Success => "Success",
            BackupStatus::Failed => "Failed",
            BackupStatus::Unknown => "Unknown",
        }
    }
}

impl Progress for BackupStatus {
    fn phase(&self) -> Phase {
        match self {
            BackupStatus::Success => Phase::Succeeded,
            BackupStatus::Failed => Phase::Failed,
            BackupStatus::Creating | BackupStatus::Unknown => Phase::Pending,
        }
    }

    fn label(&self) -> &str {
        self.as_str()
    }
}

/// Status of an asynchronous backup job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    NoStart,
    Preparing,
    Waiting,
    Uploading,
    Checking,
    Creating,
    Finished,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NoStart => "NoStart",
            TaskStatus::Preparing => "Preparing",
            TaskStatus::Waiting => "Waiting",
            TaskStatus::Uploading => "Uploading",
            TaskStatus::Checking => "Checking",
            TaskStatus::Creating => "Creating",
            TaskStatus::Finished => "Finished",
            TaskStatus::Failed => "Failed",
            TaskStatus::Unknown => "Unknown",
        }
    }
}

impl Progress for TaskStatus {
    fn phase(&self) -> Phase {
        match self {
            TaskStatus::Finished => Phase::Succeeded,
            TaskStatus::Failed => Phase::Failed,
            _ => Phase::Pending,
        }
    }

    fn label(&self) -> &str {
        self.as_str()
    }
}

/// Whether a backup was taken by the service's schedule or on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupMode {
    Automated,
    Manual,
    #[serde(other)]
    Unknown,
}

impl BackupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupMode::Automated => "Automated",
            BackupMode::Manual => "Manual",
            BackupMode::Unknown => "Unknown",
        }
    }
}

/// One backup known to the remote service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Assigned by the service, immutable.
    #[serde(rename = "BackupId")]
    pub id: String,
    #[serde(rename = "DBInstanceId", default)]
    pub instance_id: String,
    #[serde(rename = "BackupStatus", default)]
    pub status: BackupStatus,
    #[serde(rename = "BackupStartTime", default, deserialize_with = "lenient_time")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "BackupEndTime", default, deserialize_with = "lenient_time")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "BackupMethod", default)]
    pub method: String,
    #[serde(rename = "BackupType", default)]
    pub backup_type: String,
    #[serde(rename = "BackupMode", default)]
    pub mode: Option<BackupMode>,
    #[serde(rename = "BackupScale", default)]
    pub scale: String,
    #[serde(rename = "BackupSize", default)]
    pub size_bytes: u64,
    #[serde(rename = "BackupLocation", default)]
    pub location: String,
    #[serde(rename = "BackupDownloadURL", default)]
    pub download_url: String,
    #[serde(rename = "BackupIntranetDownloadURL", default)]
    pub intranet_download_url: String,
    #[serde(rename = "ConsistentTime", default)]
    pub consistent_time: String,
    #[serde(rename = "StoreStatus", default)]
    pub store_status: String,
    #[serde(rename = "BackupDBNames", default)]
    pub db_names: String,
    #[serde(rename = "HostInstanceID", default)]
    pub host_instance_id: String,
}

impl BackupRecord {
    pub fn new(id: impl Into<String>, instance_id: impl Into<String>, status: BackupStatus) -> Self {
        Self {
            id: id.into(),
            instance_id: instance_id.into(),
            status,
            ..Default::default()
        }
    }
}

impl Progress for BackupRecord {
    fn phase(&self) -> Phase {
        self.status.phase()
    }

    fn label(&self) -> &str {
        self.status.as_str()
    }
}

/// Asynchronous job created by a backup submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupTask {
    #[serde(rename = "BackupJobId")]
    pub job_id: String,
    #[serde(rename = "DBInstanceId", default)]
    pub instance_id: String,
    #[serde(rename = "BackupStatus", default)]
    pub status: TaskStatus,
    #[serde(rename = "BackupProgressStatus", default)]
    pub progress: Option<String>,
}

impl Progress for BackupTask {
    fn phase(&self) -> Phase {
        self.status.phase()
    }

    fn label(&self) -> &str {
        self.status.as_str()
    }
}

/// Handle to a submitted backup job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub job_id: String,
}

/// What a backup submission hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum CreationOutcome {
    /// The service created the backup inline, possibly echoing the record.
    Synchronous(Option<BackupRecord>),
    /// The service queued a job that has to be polled.
    Async(TaskHandle),
}

/// Desired state of a backup resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSpec {
    pub instance_id: String,
    pub method: Option<String>,
    pub backup_type: Option<String>,
    pub db_name: Option<String>,
    pub strategy: Option<String>,
}

impl BackupSpec {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Default::default()
        }
    }
}

/// State persisted by the configuration layer for a provisioned backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupState {
    /// The composite `<backupId>:<instanceId>` identity.
    pub id: String,
    pub backup_id: String,
    pub backup_method: String,
    pub backup_type: String,
}

/// Query against the list API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupQuery {
    pub instance_id: String,
    pub backup_id: Option<String>,
    pub status: Option<BackupStatus>,
    pub mode: Option<BackupMode>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl BackupQuery {
    /// Every backup of an instance.
    pub fn instance(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Default::default()
        }
    }

    /// A single backup of an instance.
    pub fn backup(instance_id: impl Into<String>, backup_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            backup_id: Some(backup_id.into()),
            ..Default::default()
        }
    }
}

/// Request to restore a backup, or a point in time, into a new instance.
///
/// Exactly one of `backup_id` and `restore_time` selects what is restored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneSpec {
    pub source_instance_id: String,
    pub backup_id: Option<String>,
    pub restore_time: Option<DateTime<Utc>>,
    /// `Postpaid` or `Prepaid`.
    pub pay_type: Option<String>,
    /// Billing period in months for prepaid instances.
    pub period_months: Option<u32>,
    pub instance_class: Option<String>,
    pub storage_gb: Option<u32>,
    pub vswitch_id: Option<String>,
}

impl CloneSpec {
    /// Restore `backup_id` of `source_instance_id`.
    pub fn from_backup(source_instance_id: impl Into<String>, backup_id: impl Into<String>) -> Self {
        Self {
            source_instance_id: source_instance_id.into(),
            backup_id: Some(backup_id.into()),
            ..Default::default()
        }
    }

    /// Restore `source_instance_id` as it was at `at`.
    pub fn at_time(source_instance_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            source_instance_id: source_instance_id.into(),
            restore_time: Some(at),
            ..Default::default()
        }
    }
}

/// Lifecycle status of a database instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstanceStatus {
    Creating,
    Running,
    Restoring,
    #[serde(rename = "INS_CLONING")]
    Cloning,
    Deleting,
    Released,
    #[default]
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Creating => "Creating",
            InstanceStatus::Running => "Running",
            InstanceStatus::Restoring => "Restoring",
            InstanceStatus::Cloning => "INS_CLONING",
            InstanceStatus::Deleting => "Deleting",
            InstanceStatus::Released => "Released",
            InstanceStatus::Unknown => "Unknown",
        }
    }
}

impl Progress for InstanceStatus {
    fn phase(&self) -> Phase {
        match self {
            InstanceStatus::Running => Phase::Succeeded,
            InstanceStatus::Deleting | InstanceStatus::Released => Phase::Failed,
            _ => Phase::Pending,
        }
    }

    fn label(&self) -> &str {
        self.as_str()
    }
}

/// A database instance as the service describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbInstance {
    #[serde(rename = "DBInstanceId")]
    pub id: String,
    #[serde(rename = "DBInstanceStatus", default)]
    pub status: InstanceStatus,
    #[serde(rename = "Engine", default)]
    pub engine: String,
    #[serde(rename = "EngineVersion", default)]
    pub engine_version: String,
    #[serde(rename = "DBInstanceClass", default)]
    pub instance_class: String,
    #[serde(rename = "DBInstanceStorage", default)]
    pub storage_gb: u32,
    #[serde(rename = "ZoneId", default)]
    pub zone_id: String,
    #[serde(rename = "ConnectionString", default)]
    pub connection_string: String,
    #[serde(rename = "Port", default)]
    pub port: String,
}

impl DbInstance {
    pub fn new(id: impl Into<String>, status: InstanceStatus) -> Self {
        Self {
            id: id.into(),
            status,
            ..Default::default()
        }
    }
}

impl Progress for DbInstance {
    fn phase(&self) -> Phase {
        self.status.phase()
    }

    fn label(&self) -> &str {
        self.status.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_phases() {
        for status in [
            TaskStatus::NoStart,
            TaskStatus::Preparing,
            TaskStatus::Waiting,
            TaskStatus::Uploading,
            TaskStatus::Checking,
            TaskStatus::Creating,
            TaskStatus::Unknown,
        ] {
            assert_eq!(status.phase(), Phase::Pending, "{status:?}");
        }
        assert_eq!(TaskStatus::Finished.phase(), Phase::Succeeded);
        assert_eq!(TaskStatus::Failed.phase(), Phase::Failed);
    }

    #[test]
    fn record_phases() {
        assert_eq!(BackupStatus::Creating.phase(), Phase::Pending);
        assert_eq!(BackupStatus::Success.phase(), Phase::Succeeded);
        assert_eq!(BackupStatus::Failed.phase(), Phase::Failed);
    }

    #[test]
    fn parse_service_record() {
        let json = r#"{
            "BackupId": "321020562",
            "DBInstanceId": "rm-uf6wjk5xxxxxxx",
            "BackupStatus": "Success",
            "BackupStartTime": "2019-03-13T15:46:37Z",
            "BackupEndTime": "2019-03-13T15:48:02Z",
            "BackupType": "FullBackup",
            "BackupMode": "Automated",
            "BackupMethod": "Physical",
            "BackupScale": "DBInstance",
            "BackupSize": 2167808,
            "BackupLocation": "OSS",
            "BackupDownloadURL": "http://download.example/backup.tar.gz",
            "StoreStatus": "Disabled",
            "HostInstanceID": "5882781"
        }"#;

        let record: BackupRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "321020562");
        assert_eq!(record.status, BackupStatus::Success);
        assert_eq!(record.mode, Some(BackupMode::Automated));
        assert_eq!(record.size_bytes, 2167808);
        assert_eq!(record.method, "Physical");
        assert!(record.start_time.unwrap() < record.end_time.unwrap());
        assert_eq!(record.intranet_download_url, "");
    }

    #[test]
    fn in_progress_record_with_blank_end_time() {
        let record: BackupRecord = serde_json::from_str(
            r#"{
                "BackupId": "bk-2",
                "BackupStatus": "Creating",
                "BackupStartTime": "2019-03-13T15:46:37Z",
                "BackupEndTime": ""
            }"#,
        )
        .unwrap();
        assert_eq!(record.status, BackupStatus::Creating);
        assert!(record.start_time.is_some());
        assert_eq!(record.end_time, None);
    }

    #[test]
    fn odd_timestamps_are_absent() {
        let record: BackupRecord = serde_json::from_str(
            r#"{"BackupId": "bk-3", "BackupStartTime": "yesterday", "BackupEndTime": null}"#,
        )
        .unwrap();
        assert_eq!(record.start_time, None);
        assert_eq!(record.end_time, None);
    }

    #[test]
    fn minute_precision_timestamps() {
        let t = parse_time("2019-03-13T15:46Z").unwrap();
        assert_eq!(t.to_rfc3339(), "2019-03-13T15:46:00+00:00");
        assert_eq!(parse_time("  "), None);
    }

    #[test]
    fn unknown_mode_does_not_fail_the_record() {
        let record: BackupRecord =
            serde_json::from_str(r#"{"BackupId": "bk-4", "BackupMode": "Scheduled"}"#).unwrap();
        assert_eq!(record.mode, Some(BackupMode::Unknown));
    }

    #[test]
    fn instance_phases() {
        assert_eq!(InstanceStatus::Running.phase(), Phase::Succeeded);
        assert_eq!(InstanceStatus::Released.phase(), Phase::Failed);
        for status in [
            InstanceStatus::Creating,
            InstanceStatus::Restoring,
            InstanceStatus::Cloning,
            InstanceStatus::Unknown,
        ] {
            assert_eq!(status.phase(), Phase::Pending, "{status:?}");
        }

        let instance: DbInstance = serde_json::from_str(
            r#"{"DBInstanceId": "rm-2", "DBInstanceStatus": "INS_CLONING", "DBInstanceStorage": 20}"#,
        )
        .unwrap();
        assert_eq!(instance.status, InstanceStatus::Cloning);
        assert_eq!(instance.storage_gb, 20);
    }

    #[test]
    fn unknown_statuses_are_pending() {
        let task: BackupTask =
            serde_json::from_str(r#"{"BackupJobId": "9", "BackupStatus": "Compressing"}"#).unwrap();
        assert_eq!(task.status, TaskStatus::Unknown);
        assert_eq!(task.phase(), Phase::Pending);
    }
}
