//! Reconciliation pass - extends object-lock retention on every backup object.
//!
//! This module ties together:
//! - Manifest discovery under the cluster prefix
//! - Manifest decoding and key resolution
//! - The per-object retention decision
//! - Per-object and per-manifest failure isolation

pub mod summary;

use crate::config::Config;
use crate::manifest::discovery::find_manifests;
use crate::manifest::keys::{resolve_hostname_path, resolve_object_key};
use crate::manifest::Manifest;
use crate::retention::RetentionTarget;
use crate::store::{ObjectRetention, ObjectStore, StoreError};
use crate::utils::errors::Result;
use chrono::{DateTime, Utc};
use futures_util::{future, stream, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use summary::{format_bytes, format_duration, ObjectOutcome, RunSummary};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything one pass needs besides the store handle.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub bucket: String,
    pub cluster: String,
    pub target: RetentionTarget,
    pub dry_run: bool,
    /// Objects checked concurrently within one manifest
    pub concurrency: usize,
}

impl ReconcileOptions {
    /// Resolve a validated configuration against `now`.
    pub fn from_config(config: &Config, now: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        let target = config.retention.policy()?.target(now, config.retention.mode)?;

        Ok(Self {
            bucket: config.target.bucket.clone(),
            cluster: config.target.cluster.clone(),
            target,
            dry_run: config.run.dry_run,
            concurrency: config.run.concurrency.max(1),
        })
    }
}

/// Drives one reconciliation pass against a store.
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    options: ReconcileOptions,
    cancel_token: CancellationToken,
}

impl Reconciler {
    /// Create a reconciler (no cancellation support)
    pub fn new(store: Arc<dyn ObjectStore>, options: ReconcileOptions) -> Self {
        Self::with_cancel(store, options, CancellationToken::new())
    }

    /// Create a reconciler that stops picking up work once `cancel_token` fires
    pub fn with_cancel(
        store: Arc<dyn ObjectStore>,
        options: ReconcileOptions,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            options,
            cancel_token,
        }
    }

    /// Run one full pass.
    ///
    /// Only discovery failures are returned as errors. Manifest and object
    /// failures are logged, counted in the summary, and skipped.
    pub async fn run(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "reconcile",
            %run_id,
            bucket = %self.options.bucket,
            cluster = %self.options.cluster,
            dry_run = self.options.dry_run
        );

        self.run_pass(run_id).instrument(span).await
    }

    async fn run_pass(&self, run_id: Uuid) -> Result<RunSummary> {
        let start_time = Instant::now();
        let target = self.options.target;
        let mut summary = RunSummary::new(run_id, self.options.dry_run, target.retain_until);

        info!(
            threshold = %target.threshold.to_rfc3339(),
            until = %target.retain_until.to_rfc3339(),
            mode = %target.mode,
            concurrency = self.options.concurrency,
            "Starting reconciliation"
        );

        let manifests = find_manifests(self.store.as_ref(), &self.options.bucket, &self.options.cluster).await?;
        summary.manifests_found = manifests.len();
        info!("Found {} manifests", manifests.len());

        for (index, manifest_key) in manifests.iter().enumerate() {
            if self.cancel_token.is_cancelled() {
                warn!(
                    "Run cancelled, {} of {} manifests not processed",
                    manifests.len() - index,
                    manifests.len()
                );
                break;
            }

            info!(manifest = %manifest_key, "Processing manifest");
            match self.process_manifest(manifest_key, &mut summary).await {
                Ok(()) => summary.manifests_processed += 1,
                Err(e) => {
                    error!(manifest = %manifest_key, error = %e, "Skipping manifest");
                    summary.manifests_failed += 1;
                }
            }
        }

        summary.cancelled = self.cancel_token.is_cancelled();
        summary.duration_secs = start_time.elapsed().as_secs();

        info!(
            manifests = summary.manifests_processed,
            manifests_failed = summary.manifests_failed,
            objects = summary.objects_seen,
            updated = summary.updated,
            would_update = summary.would_update,
            already_satisfied = summary.already_satisfied,
            failed = summary.failed_objects(),
            "Done in {} ({} of retention extended)",
            format_duration(summary.duration_secs),
            format_bytes(summary.bytes_updated)
        );

        Ok(summary)
    }

    /// Fetch one manifest and reconcile every object it references.
    async fn process_manifest(&self, manifest_key: &str, summary: &mut RunSummary) -> Result<()> {
        let body = self.store.get(&self.options.bucket, manifest_key).await?;
        let manifest = Manifest::parse(&body)?;
        let hostname_path = resolve_hostname_path(manifest_key)?;

        debug!(
            manifest = %manifest_key,
            objects = manifest.len(),
            size = %format_bytes(manifest.total_bytes()),
            "Manifest decoded"
        );

        let token = self.cancel_token.clone();
        let outcomes: Vec<(ObjectOutcome, Option<u64>)> = stream::iter(manifest.objects)
            .take_while(move |_| future::ready(!token.is_cancelled()))
            .map(|object| {
                let key = resolve_object_key(&hostname_path, &object.path);
                async move { (self.reconcile_object(&key).await, object.size) }
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for (outcome, size) in outcomes {
            summary.record(outcome, size);
        }

        Ok(())
    }

    /// Check one object and extend its retention if it falls short.
    async fn reconcile_object(&self, key: &str) -> ObjectOutcome {
        let target = &self.options.target;

        let current = match self.current_retention(key).await {
            Ok(current) => current,
            Err(e) => {
                warn!(key = %key, error = %e, "Error checking retention, skipping object");
                return ObjectOutcome::QueryFailed;
            }
        };

        if !target.needs_update(current.retain_until) {
            debug!(key = %key, current = ?current.retain_until, "Retention already sufficient");
            return ObjectOutcome::AlreadySatisfied;
        }

        let mode = current
            .mode
            .map_or(target.mode, |existing| existing.strongest(target.mode));
        let until = target.retain_until.to_rfc3339();

        if self.options.dry_run {
            info!(key = %key, until = %until, mode = %mode, "[DRY-RUN] Would update retention");
            return ObjectOutcome::WouldUpdate;
        }

        match self
            .store
            .put_retention(&self.options.bucket, key, mode, target.retain_until)
            .await
        {
            Ok(()) => {
                info!(key = %key, until = %until, mode = %mode, "Updated retention");
                ObjectOutcome::Updated
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Error updating retention, skipping object");
                ObjectOutcome::UpdateFailed
            }
        }
    }

    /// Current retention, with "never locked" and "missing" both read as unprotected.
    async fn current_retention(&self, key: &str) -> std::result::Result<ObjectRetention, StoreError> {
        match self.store.get_retention(&self.options.bucket, key).await {
            Ok(retention) => Ok(retention),
            Err(StoreError::NoRetentionConfigured(_)) => Ok(ObjectRetention::default()),
            Err(StoreError::NotFound(_)) => {
                debug!(key = %key, "Object not found while checking retention");
                Ok(ObjectRetention::default())
            }
            Err(e) => Err(e),
        }
    }
}
