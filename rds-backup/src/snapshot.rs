//! Point-in-time backup listings and the differ that finds new records.

use std::collections::HashSet;

use crate::model::BackupRecord;

/// Every backup of one instance, captured at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub instance_id: String,
    pub records: Vec<BackupRecord>,
}

impl Snapshot {
    pub fn new(instance_id: impl Into<String>, records: Vec<BackupRecord>) -> Self {
        Self {
            instance_id: instance_id.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, backup_id: &str) -> bool {
        self.records.iter().any(|r| r.id == backup_id)
    }

    pub fn find(&self, backup_id: &str) -> Option<&BackupRecord> {
        self.records.iter().find(|r| r.id == backup_id)
    }
}

/// Records in `after` whose id is absent from `before`, in `after`'s order.
///
/// Membership is decided on `id` alone.
pub fn diff(before: &Snapshot, after: &Snapshot) -> Vec<BackupRecord> {
    let known: HashSet<&str> = before.records.iter().map(|r| r.id.as_str()).collect();

    after
        .records
        .iter()
        .filter(|r| !known.contains(r.id.as_str()))
        .cloned()
        .collect()
}
