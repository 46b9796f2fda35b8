//! HTTP client for the RDS backup action API.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{BackupApi, BackupPage};
use crate::error::ApiError;
use crate::model::{
    BackupQuery, BackupRecord, BackupSpec, BackupTask, CloneSpec, CreationOutcome, DbInstance,
    TaskHandle,
};

const INSTANCE_NOT_FOUND: &str = "InvalidDBInstanceId.NotFound";
const BACKUP_NOT_FOUND: &[&str] = &["InvalidBackupId.NotFound", "InvalidBackupSetID.NotFound"];

/// Timestamp format the list API expects for time filters.
const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// Timestamp format for point-in-time restores.
const RESTORE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(u64),
    Text(String),
}

impl Count {
    /// `None` when the text is not a number.
    fn value(&self) -> Option<u64> {
        match self {
            Count::Number(n) => Some(*n),
            Count::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DescribeBackupsResponse {
    #[serde(rename = "TotalRecordCount")]
    total_record_count: Option<Count>,
    #[serde(rename = "PageNumber")]
    page_number: Option<Count>,
    #[serde(rename = "Items", default)]
    items: BackupItems,
}

#[derive(Debug, Default, Deserialize)]
struct BackupItems {
    #[serde(rename = "Backup", default)]
    backup: Vec<BackupRecord>,
}

#[derive(Debug, Deserialize)]
struct DescribeBackupTasksResponse {
    #[serde(rename = "Items", default)]
    items: BackupJobItems,
}

#[derive(Debug, Default, Deserialize)]
struct BackupJobItems {
    #[serde(rename = "BackupJob", default)]
    backup_job: Vec<BackupTask>,
}

#[derive(Debug, Deserialize)]
struct CreateBackupResponse {
    #[serde(rename = "BackupJobId", default)]
    backup_job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloneDbInstanceResponse {
    #[serde(rename = "DBInstanceId")]
    db_instance_id: String,
}

#[derive(Debug, Deserialize)]
struct DescribeDbInstanceAttributeResponse {
    #[serde(rename = "Items", default)]
    items: InstanceItems,
}

#[derive(Debug, Default, Deserialize)]
struct InstanceItems {
    #[serde(rename = "DBInstanceAttribute", default)]
    attributes: Vec<DbInstance>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// Client for the RDS backup API.
#[derive(Clone)]
pub struct RdsClient {
    http: Client,
    endpoint: String,
    region: Option<String>,
    token: Option<String>,
}

impl RdsClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            region: None,
            token: None,
        }
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Invoke one API action and decode its JSON answer.
    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<T, ApiError> {
        debug!("Calling {} at {}", action, self.endpoint);

        params.push(("Action", action.to_string()));
        if let Some(region) = &self.region {
            params.push(("RegionId", region.clone()));
        }

        let mut request = self.http.get(&self.endpoint).query(&params);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{}: {}", action, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("{}: {}", action, e)))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body, &params));
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{}: {}", action, e)))
    }
}

fn param<'a>(params: &'a [(&'static str, String)], name: &str) -> &'a str {
    params
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_default()
}

fn classify_error(status: u16, body: &str, params: &[(&'static str, String)]) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) if err.code == INSTANCE_NOT_FOUND => {
            ApiError::InstanceNotFound(param(params, "DBInstanceId").to_string())
        }
        Ok(err) if BACKUP_NOT_FOUND.contains(&err.code.as_str()) => {
            ApiError::BackupNotFound(param(params, "BackupId").to_string())
        }
        Ok(err) => ApiError::Service {
            code: err.code,
            message: err.message,
        },
        Err(_) => ApiError::Service {
            code: format!("HTTP{}", status),
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl BackupApi for RdsClient {
    async fn list_backups(
        &self,
        query: &BackupQuery,
        page_number: u32,
        page_size: u32,
    ) -> Result<BackupPage, ApiError> {
        let mut params = vec![
            ("DBInstanceId", query.instance_id.clone()),
            ("PageNumber", page_number.to_string()),
            ("PageSize", page_size.to_string()),
        ];
        if let Some(backup_id) = &query.backup_id {
            params.push(("BackupId", backup_id.clone()));
        }
        if let Some(status) = query.status {
            params.push(("BackupStatus", status.as_str().to_string()));
        }
        if let Some(mode) = query.mode {
            params.push(("BackupMode", mode.as_str().to_string()));
        }
        if let Some(start) = query.start_time {
            params.push(("StartTime", start.format(QUERY_TIME_FORMAT).to_string()));
        }
        if let Some(end) = query.end_time {
            params.push(("EndTime", end.format(QUERY_TIME_FORMAT).to_string()));
        }

        let resp: DescribeBackupsResponse = self.call("DescribeBackups", params).await?;
        let records = resp.items.backup;
        Ok(BackupPage {
            total_count: resp.total_record_count.and_then(|c| c.value()),
            page_number: resp
                .page_number
                .and_then(|c| c.value())
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(page_number),
            page_size,
            records,
        })
    }

    async fn create_backup(&self, spec: &BackupSpec) -> Result<CreationOutcome, ApiError> {
        let mut params = vec![("DBInstanceId", spec.instance_id.clone())];
        let optional = [
            ("BackupMethod", &spec.method),
            ("BackupType", &spec.backup_type),
            ("DBName", &spec.db_name),
            ("BackupStrategy", &spec.strategy),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                params.push((name, value.clone()));
            }
        }

        let resp: CreateBackupResponse = self.call("CreateBackup", params).await?;
        Ok(match resp.backup_job_id.filter(|id| !id.is_empty()) {
            Some(job_id) => CreationOutcome::Async(TaskHandle { job_id }),
            None => CreationOutcome::Synchronous(None),
        })
    }

    async fn get_task_status(
        &self,
        instance_id: &str,
        job_id: &str,
    ) -> Result<BackupTask, ApiError> {
        let params = vec![
            ("DBInstanceId", instance_id.to_string()),
            ("BackupJobId", job_id.to_string()),
        ];
        let resp: DescribeBackupTasksResponse = self.call("DescribeBackupTasks", params).await?;
        resp.items
            .backup_job
            .into_iter()
            .find(|job| job.job_id == job_id)
            .ok_or_else(|| ApiError::Service {
                code: "BackupJobNotFound".to_string(),
                message: format!("backup job {} not reported for {}", job_id, instance_id),
            })
    }

    async fn delete_backup(&self, instance_id: &str, backup_id: &str) -> Result<(), ApiError> {
        let params = vec![
            ("DBInstanceId", instance_id.to_string()),
            ("BackupId", backup_id.to_string()),
        ];
        let _: serde_json::Value = self.call("DeleteBackup", params).await?;
        Ok(())
    }

    async fn clone_instance(&self, spec: &CloneSpec) -> Result<String, ApiError> {
        let mut params = vec![("DBInstanceId", spec.source_instance_id.clone())];
        if let Some(backup_id) = &spec.backup_id {
            params.push(("RestoreType", "BackupSet".to_string()));
            params.push(("BackupId", backup_id.clone()));
        }
        if let Some(at) = spec.restore_time {
            params.push(("RestoreType", "BackupTime".to_string()));
            params.push(("RestoreTime", at.format(RESTORE_TIME_FORMAT).to_string()));
        }
        params.push((
            "PayType",
            spec.pay_type.clone().unwrap_or_else(|| "Postpaid".to_string()),
        ));
        if spec.pay_type.as_deref() == Some("Prepaid") {
            let months = spec.period_months.unwrap_or(1);
            if months > 9 && months % 12 == 0 {
                params.push(("Period", "Year".to_string()));
                params.push(("UsedTime", (months / 12).to_string()));
            } else {
                params.push(("Period", "Month".to_string()));
                params.push(("UsedTime", months.to_string()));
            }
        }
        if let Some(class) = &spec.instance_class {
            params.push(("DBInstanceClass", class.clone()));
        }
        if let Some(storage) = spec.storage_gb {
            params.push(("DBInstanceStorage", storage.to_string()));
        }
        match &spec.vswitch_id {
            Some(vswitch_id) => {
                params.push(("InstanceNetworkType", "VPC".to_string()));
                params.push(("VSwitchId", vswitch_id.clone()));
            }
            None => params.push(("InstanceNetworkType", "Classic".to_string())),
        }

        let resp: CloneDbInstanceResponse = self.call("CloneDBInstance", params).await?;
        Ok(resp.db_instance_id)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<DbInstance, ApiError> {
        let params = vec![("DBInstanceId", instance_id.to_string())];
        let resp: DescribeDbInstanceAttributeResponse =
            self.call("DescribeDBInstanceAttribute", params).await?;
        resp.items
            .attributes
            .into_iter()
            .find(|instance| instance.id == instance_id)
            .ok_or_else(|| ApiError::InstanceNotFound(instance_id.to_string()))
    }
}
