//! rds-backup: provision and reconcile RDS backups from the command line.
//!
//! - create: submit a backup and print the identity to persist
//! - read: refresh a backup by identity
//! - delete: delete a backup and wait until it is gone
//! - list: list an instance's backups with filters
//! - restore: restore a backup or point in time into a new instance

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rds_backup::model::{BackupMode, BackupQuery, BackupSpec, BackupStatus, CloneSpec};
use rds_backup::{datasource, BackupReconciler, RdsClient, ReconcileConfig, ResourceIdentity};

/// RDS backup reconciler
#[derive(Parser, Debug)]
#[command(name = "rds-backup", version, about)]
struct Args {
    /// RDS API endpoint
    #[arg(long, env = "RDS_ENDPOINT", default_value = "https://rds.aliyuncs.com")]
    endpoint: String,

    /// Bearer token for the API endpoint
    #[arg(long, env = "RDS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Region of the database instances
    #[arg(long, env = "RDS_REGION")]
    region: Option<String>,

    /// Seconds before the first backup job status check
    #[arg(long, default_value = "5")]
    poll_interval: u64,

    /// Seconds between status checks and list retries
    #[arg(long, default_value = "3")]
    min_interval: u64,

    /// Seconds a create may take
    #[arg(long, default_value = "600")]
    create_timeout: u64,

    /// Seconds a restored instance may take to become running
    #[arg(long, default_value = "1800")]
    clone_timeout: u64,

    /// Seconds a delete may take
    #[arg(long, default_value = "180")]
    delete_timeout: u64,

    /// Page size for backup listings
    #[arg(long, default_value = "100")]
    page_size: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a backup and print its state
    Create {
        /// Database instance to back up
        #[arg(long)]
        instance_id: String,
        /// Backup method (e.g. Physical, Logical, Snapshot)
        #[arg(long)]
        method: Option<String>,
        /// Backup type (e.g. FullBackup, IncrementalBackup)
        #[arg(long)]
        backup_type: Option<String>,
        /// Database to back up
        #[arg(long)]
        db_name: Option<String>,
        /// Backup strategy (e.g. db, instance)
        #[arg(long)]
        strategy: Option<String>,
    },
    /// Print the current record of a backup
    Read {
        /// Backup identity, <backupId>:<instanceId>
        id: String,
    },
    /// Delete a backup
    Delete {
        /// Backup identity, <backupId>:<instanceId>
        id: String,
    },
    /// List an instance's backups
    List {
        #[arg(long)]
        instance_id: String,
        #[arg(long)]
        backup_id: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        #[arg(long, value_enum)]
        mode: Option<ModeFilter>,
        /// RFC 3339 lower bound of the backup start time
        #[arg(long)]
        start_time: Option<DateTime<Utc>>,
        /// RFC 3339 upper bound of the backup end time
        #[arg(long)]
        end_time: Option<DateTime<Utc>>,
        /// Also write the listing to this file
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
    /// Restore a backup or point in time into a new instance
    Restore {
        /// Instance the backup belongs to
        #[arg(long)]
        instance_id: String,
        /// Backup to restore
        #[arg(long, conflicts_with = "restore_time", required_unless_present = "restore_time")]
        backup_id: Option<String>,
        /// RFC 3339 point in time to restore
        #[arg(long)]
        restore_time: Option<DateTime<Utc>>,
        #[arg(long, value_enum, default_value = "postpaid")]
        pay_type: PayType,
        /// Billing period in months (prepaid only)
        #[arg(long)]
        period: Option<u32>,
        /// Instance class of the new instance
        #[arg(long)]
        instance_class: Option<String>,
        /// Storage of the new instance in GB
        #[arg(long)]
        storage: Option<u32>,
        /// VSwitch for a VPC instance
        #[arg(long)]
        vswitch_id: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PayType {
    Postpaid,
    Prepaid,
}

impl PayType {
    fn as_str(&self) -> &'static str {
        match self {
            PayType::Postpaid => "Postpaid",
            PayType::Prepaid => "Prepaid",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusFilter {
    Success,
    Failed,
}

impl From<StatusFilter> for BackupStatus {
    fn from(s: StatusFilter) -> Self {
        match s {
            StatusFilter::Success => BackupStatus::Success,
            StatusFilter::Failed => BackupStatus::Failed,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeFilter {
    Automated,
    Manual,
}

impl From<ModeFilter> for BackupMode {
    fn from(m: ModeFilter) -> Self {
        match m {
            ModeFilter::Automated => BackupMode::Automated,
            ModeFilter::Manual => BackupMode::Manual,
        }
    }
}

impl Args {
    fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            poll_interval: Duration::from_secs(self.poll_interval),
            min_interval: Duration::from_secs(self.min_interval),
            create_timeout: Duration::from_secs(self.create_timeout),
            clone_timeout: Duration::from_secs(self.clone_timeout),
            delete_budget: Duration::from_secs(self.delete_timeout),
            list_page_size: self.page_size,
            ..ReconcileConfig::default()
        }
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to encode output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rds_backup=info,reqwest=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.reconcile_config();
    info!("API endpoint: {}", args.endpoint);

    let client = Arc::new(
        RdsClient::new(args.endpoint.clone())
            .with_region(args.region.clone())
            .with_token(args.token.clone()),
    );
    let reconciler = BackupReconciler::new(Arc::clone(&client), config.clone());

    match args.command {
        Command::Create {
            instance_id,
            method,
            backup_type,
            db_name,
            strategy,
        } => {
            let spec = BackupSpec {
                instance_id: instance_id.trim().to_string(),
                method: trimmed(method),
                backup_type: trimmed(backup_type),
                db_name: trimmed(db_name),
                strategy: trimmed(strategy),
            };
            let created = reconciler
                .create(&spec)
                .await
                .with_context(|| format!("Failed to create backup on {}", spec.instance_id))?;
            print_json(&created.state)?;
        }
        Command::Read { id } => {
            let identity = ResourceIdentity::decode(&id)?;
            match reconciler
                .read(&identity)
                .await
                .with_context(|| format!("Failed to read backup {}", id))?
            {
                Some(record) => print_json(&record)?,
                None => info!("Backup {} no longer exists", id),
            }
        }
        Command::Delete { id } => {
            let identity = ResourceIdentity::decode(&id)?;
            reconciler
                .delete(&identity)
                .await
                .with_context(|| format!("Failed to delete backup {}", id))?;
            info!("Backup {} deleted", id);
        }
        Command::List {
            instance_id,
            backup_id,
            status,
            mode,
            start_time,
            end_time,
            output_file,
        } => {
            let query = BackupQuery {
                instance_id,
                backup_id: trimmed(backup_id),
                status: status.map(BackupStatus::from),
                mode: mode.map(BackupMode::from),
                start_time,
                end_time,
            };
            let backups = datasource::list_backups(client.as_ref(), &query, config.list_page_size)
                .await
                .with_context(|| format!("Failed to list backups of {}", query.instance_id))?;
            if let Some(path) = output_file {
                datasource::write_output(&path, &backups)?;
            }
            print_json(&backups)?;
        }
        Command::Restore {
            instance_id,
            backup_id,
            restore_time,
            pay_type,
            period,
            instance_class,
            storage,
            vswitch_id,
        } => {
            let spec = CloneSpec {
                source_instance_id: instance_id.trim().to_string(),
                backup_id: trimmed(backup_id),
                restore_time,
                pay_type: Some(pay_type.as_str().to_string()),
                period_months: period,
                instance_class: trimmed(instance_class),
                storage_gb: storage,
                vswitch_id: trimmed(vswitch_id),
            };
            let instance = reconciler
                .clone_instance(&spec)
                .await
                .with_context(|| format!("Failed to restore from {}", spec.source_instance_id))?;
            print_json(&instance)?;
        }
    }

    Ok(())
}
