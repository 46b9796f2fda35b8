//! Shared test utilities for rds-backup integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rds_backup::model::{
    BackupQuery, BackupRecord, BackupSpec, BackupStatus, BackupTask, CloneSpec, CreationOutcome,
    DbInstance, InstanceStatus, TaskHandle, TaskStatus,
};
use rds_backup::{ApiError, BackupApi, BackupPage};

/// Pop the next scripted value; the last one repeats forever.
fn next<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[derive(Default)]
struct Script {
    listings: VecDeque<Result<Vec<BackupRecord>, ApiError>>,
    current: Vec<BackupRecord>,
    outcome: Option<Result<CreationOutcome, ApiError>>,
    statuses: VecDeque<TaskStatus>,
    deletes: VecDeque<Result<(), ApiError>>,
    submitted: Vec<BackupSpec>,
    hide_totals: bool,
    clone_result: Option<Result<String, ApiError>>,
    instance_statuses: VecDeque<InstanceStatus>,
    restores: Vec<CloneSpec>,
}

/// Scripted backup service.
///
/// Each first-page list call consumes the next scripted listing; task
/// statuses and delete results are consumed one per call. The last scripted
/// value of each sequence keeps being returned once the rest is used up.
#[derive(Default)]
pub struct FakeApi {
    script: Mutex<Script>,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub clone_calls: AtomicUsize,
    pub describe_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listings(self, listings: Vec<Vec<BackupRecord>>) -> Self {
        self.script.lock().unwrap().listings = listings.into_iter().map(Ok).collect();
        self
    }

    pub fn listing_results(self, listings: Vec<Result<Vec<BackupRecord>, ApiError>>) -> Self {
        self.script.lock().unwrap().listings = listings.into_iter().collect();
        self
    }

    pub fn outcome(self, outcome: Result<CreationOutcome, ApiError>) -> Self {
        self.script.lock().unwrap().outcome = Some(outcome);
        self
    }

    pub fn job(self, job_id: &str, statuses: Vec<TaskStatus>) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            script.outcome = Some(Ok(CreationOutcome::Async(TaskHandle {
                job_id: job_id.to_string(),
            })));
            script.statuses = statuses.into_iter().collect();
        }
        self
    }

    pub fn deletes(self, deletes: Vec<Result<(), ApiError>>) -> Self {
        self.script.lock().unwrap().deletes = deletes.into_iter().collect();
        self
    }

    /// Answer list calls without a total count.
    pub fn without_totals(self) -> Self {
        self.script.lock().unwrap().hide_totals = true;
        self
    }

    pub fn clone_result(self, result: Result<String, ApiError>) -> Self {
        self.script.lock().unwrap().clone_result = Some(result);
        self
    }

    pub fn instance_statuses(self, statuses: Vec<InstanceStatus>) -> Self {
        self.script.lock().unwrap().instance_statuses = statuses.into_iter().collect();
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn submitted(&self) -> Vec<BackupSpec> {
        self.script.lock().unwrap().submitted.clone()
    }

    pub fn restores(&self) -> Vec<CloneSpec> {
        self.script.lock().unwrap().restores.clone()
    }

    pub fn clones(&self) -> usize {
        self.clone_calls.load(Ordering::SeqCst)
    }

    pub fn describes(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn status_checks(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn deletes_issued(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackupApi for FakeApi {
    async fn list_backups(
        &self,
        query: &BackupQuery,
        page_number: u32,
        page_size: u32,
    ) -> Result<BackupPage, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();

        if page_number == 1 {
            if let Some(listing) = next(&mut script.listings) {
                script.current = listing?;
            }
        }

        let matching: Vec<BackupRecord> = script
            .current
            .iter()
            .filter(|r| query.backup_id.as_ref().map_or(true, |id| &r.id == id))
            .cloned()
            .collect();
        let total_count = (!script.hide_totals).then_some(matching.len() as u64);
        let skip = (page_number.saturating_sub(1) * page_size) as usize;

        Ok(BackupPage {
            records: matching
                .into_iter()
                .skip(skip)
                .take(page_size as usize)
                .collect(),
            total_count,
            page_number,
            page_size,
        })
    }

    async fn create_backup(&self, spec: &BackupSpec) -> Result<CreationOutcome, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        script.submitted.push(spec.clone());
        script
            .outcome
            .clone()
            .unwrap_or(Ok(CreationOutcome::Synchronous(None)))
    }

    async fn get_task_status(
        &self,
        instance_id: &str,
        job_id: &str,
    ) -> Result<BackupTask, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        Ok(BackupTask {
            job_id: job_id.to_string(),
            instance_id: instance_id.to_string(),
            status: next(&mut script.statuses).unwrap_or_default(),
            progress: None,
        })
    }

    async fn delete_backup(&self, _instance_id: &str, _backup_id: &str) -> Result<(), ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        next(&mut script.deletes).unwrap_or(Ok(()))
    }

    async fn clone_instance(&self, spec: &CloneSpec) -> Result<String, ApiError> {
        self.clone_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        script.restores.push(spec.clone());
        script
            .clone_result
            .clone()
            .unwrap_or_else(|| Ok("rm-clone".to_string()))
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<DbInstance, ApiError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let status = next(&mut script.instance_statuses).unwrap_or_default();
        Ok(DbInstance::new(instance_id, status))
    }
}

/// A backup of instance `i-1`.
pub fn record(id: &str, status: BackupStatus) -> BackupRecord {
    BackupRecord {
        method: "Physical".to_string(),
        backup_type: "FullBackup".to_string(),
        ..BackupRecord::new(id, "i-1", status)
    }
}

/// Successful backups of instance `i-1`.
pub fn records(ids: &[&str]) -> Vec<BackupRecord> {
    ids.iter().map(|id| record(id, BackupStatus::Success)).collect()
}

pub fn service_error(code: &str) -> ApiError {
    ApiError::Service {
        code: code.to_string(),
        message: "scripted failure".to_string(),
    }
}
