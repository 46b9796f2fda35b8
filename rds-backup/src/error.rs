//! Error types for backup reconciliation.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors reported by the remote backup service or the transport in front of it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The parent database instance does not exist.
    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    /// The backup does not exist on the instance.
    #[error("backup not found: {0}")]
    BackupNotFound(String),

    /// The service rejected the request.
    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    /// The request never produced a service answer.
    #[error("transport: {0}")]
    Transport(String),

    /// The service answered with a body we could not understand.
    #[error("decode: {0}")]
    Decode(String),
}

impl ApiError {
    /// True when the error means the target is already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::InstanceNotFound(_) | ApiError::BackupNotFound(_)
        )
    }
}

/// Errors that can occur while reconciling a backup resource.
#[derive(Debug, Error)]
pub enum Error {
    /// A persisted identity that is not `<backupId>:<instanceId>`.
    #[error("malformed backup identity {0:?}: expected <backupId>:<instanceId>")]
    MalformedIdentity(String),

    /// A poll, or a whole create, did not finish within its budget.
    #[error("operation did not reach a terminal status within {timeout:?}")]
    PollTimeout { timeout: Duration },

    /// The service reported the backup as failed.
    #[error("backup failed: {0}")]
    BackupFailed(String),

    /// No new backup appeared on the instance after creation.
    #[error("no new backup visible on instance {instance_id}; retry the creation")]
    ResolutionFailed { instance_id: String },

    /// More than one new backup appeared on the instance during creation.
    #[error("cannot tell which new backup on instance {instance_id} was created: {candidates:?}")]
    AmbiguousResolution {
        instance_id: String,
        candidates: Vec<String>,
    },

    /// The backup was still listed when the delete budget ran out.
    #[error("backup {backup_id} still present after {budget:?}")]
    DeleteTimeout { backup_id: String, budget: Duration },

    /// A restore request that names neither or both of a backup and a time.
    #[error("invalid restore request: {0}")]
    InvalidCloneSpec(String),

    /// Writing a listing to a file failed.
    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the remote API, passed through unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
