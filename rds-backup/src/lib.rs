//! rds-backup: declarative cloud database backups.
//!
//! This library provisions backups through the RDS backup API and keeps the
//! configuration layer's view of them current:
//! - create: submit a backup, wait for its job, resolve which backup it made
//! - read: refresh a provisioned backup, or report it gone
//! - delete: remove a backup and wait until the listing agrees
//! - restore: bring a backup or point in time back as a new instance

pub mod clients;
pub mod config;
pub mod datasource;
pub mod error;
pub mod identity;
pub mod model;
pub mod poller;
pub mod reconciler;
pub mod snapshot;

pub use clients::{BackupApi, BackupPage, RdsClient};
pub use config::ReconcileConfig;
pub use error::{ApiError, Error, Result};
pub use identity::ResourceIdentity;
pub use reconciler::{BackupReconciler, CreatedBackup, Reconciler};
