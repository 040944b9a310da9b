//! Backup Retention - Main entry point
//!
//! One reconciliation pass over the Medusa backups of a cluster. Meant to be
//! run by hand or from an external scheduler (cron, Kubernetes CronJob).

use anyhow::Result;
use backup_retention::store::s3::S3Store;
use backup_retention::store::RetentionMode;
use backup_retention::{utils, Config, ReconcileOptions, Reconciler};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// S3 bucket holding the backups
    #[arg(short, long)]
    bucket: Option<String>,

    /// Cluster name (listing prefix)
    #[arg(long)]
    cluster: Option<String>,

    /// Protect every object for this many days from now
    #[arg(long, value_name = "DAYS", conflicts_with_all = ["min_retention", "max_retention"])]
    retention: Option<i64>,

    /// Extend objects whose protection ends within this many days
    #[arg(long, value_name = "DAYS", requires = "max_retention")]
    min_retention: Option<i64>,

    /// Days from now to extend expiring objects to
    #[arg(long, value_name = "DAYS", requires = "min_retention")]
    max_retention: Option<i64>,

    /// Object lock mode (governance, compliance)
    #[arg(long)]
    mode: Option<RetentionMode>,

    /// Log intended updates without applying them
    #[arg(long)]
    dry_run: bool,

    /// Objects checked concurrently within one manifest
    #[arg(long)]
    concurrency: Option<usize>,

    /// AWS region (overrides config and environment)
    #[arg(long)]
    region: Option<String>,

    /// S3 endpoint URL for S3-compatible stores
    #[arg(long)]
    endpoint: Option<String>,

    /// Write the run summary as JSON to this file
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Args {
    /// Flags win over file and environment settings.
    fn apply(self, config: &mut Config) {
        if let Some(bucket) = self.bucket {
            config.target.bucket = bucket;
        }
        if let Some(cluster) = self.cluster {
            config.target.cluster = cluster;
        }
        if let Some(days) = self.retention {
            config.retention.retention_days = Some(days);
            config.retention.min_retention_days = None;
            config.retention.max_retention_days = None;
        }
        if let (Some(min), Some(max)) = (self.min_retention, self.max_retention) {
            config.retention.retention_days = None;
            config.retention.min_retention_days = Some(min);
            config.retention.max_retention_days = Some(max);
        }
        if let Some(mode) = self.mode {
            config.retention.mode = mode;
        }
        if self.dry_run {
            config.run.dry_run = true;
        }
        if let Some(concurrency) = self.concurrency {
            config.run.concurrency = concurrency;
        }
        if let Some(region) = self.region {
            config.s3.region = Some(region);
        }
        if let Some(endpoint) = self.endpoint {
            config.s3.endpoint = Some(endpoint);
        }
        if let Some(summary) = self.summary {
            config.run.summary_path = Some(summary);
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    // Initialize logging
    utils::logger::init(&config.log.level)?;

    tracing::info!("Starting backup-retention v{}", env!("CARGO_PKG_VERSION"));

    let options = ReconcileOptions::from_config(&config, chrono::Utc::now())?;
    let store = Arc::new(S3Store::connect(&config.s3).await);

    let cancel_token = CancellationToken::new();
    let signal_handle = utils::shutdown::cancel_on_signal(cancel_token.clone());

    let reconciler = Reconciler::with_cancel(store, options, cancel_token.clone());
    let result = reconciler.run().await;

    // Release the signal task
    cancel_token.cancel();
    let _ = signal_handle.await;

    let summary = result?;

    if let Some(path) = &config.run.summary_path {
        summary.write_json(path)?;
        tracing::info!("Summary written to {}", path.display());
    }

    if summary.has_failures() {
        tracing::warn!(
            "{} manifest(s) and {} object(s) were skipped, see log for details",
            summary.manifests_failed,
            summary.failed_objects()
        );
    }

    Ok(())
}
