//! Per-run accounting and the end-of-run report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// What happened to one referenced object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectOutcome {
    /// Retention was extended
    Updated,
    /// Dry run: retention would have been extended
    WouldUpdate,
    /// Already protected long enough
    AlreadySatisfied,
    /// Retention query failed; object skipped
    QueryFailed,
    /// Retention update was rejected; object skipped
    UpdateFailed,
}

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub retain_until: Option<DateTime<Utc>>,
    pub manifests_found: usize,
    pub manifests_processed: usize,
    pub manifests_failed: usize,
    pub objects_seen: usize,
    pub updated: usize,
    pub would_update: usize,
    pub already_satisfied: usize,
    pub query_failed: usize,
    pub update_failed: usize,
    /// Bytes covered by updated (or would-update) objects, where manifests record sizes
    pub bytes_updated: u64,
    pub cancelled: bool,
    pub duration_secs: u64,
}

impl RunSummary {
    pub fn new(run_id: Uuid, dry_run: bool, retain_until: DateTime<Utc>) -> Self {
        Self {
            run_id,
            dry_run,
            retain_until: Some(retain_until),
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: ObjectOutcome, size: Option<u64>) {
        self.objects_seen += 1;
        match outcome {
            ObjectOutcome::Updated => self.updated += 1,
            ObjectOutcome::WouldUpdate => self.would_update += 1,
            ObjectOutcome::AlreadySatisfied => self.already_satisfied += 1,
            ObjectOutcome::QueryFailed => self.query_failed += 1,
            ObjectOutcome::UpdateFailed => self.update_failed += 1,
        }
        if matches!(outcome, ObjectOutcome::Updated | ObjectOutcome::WouldUpdate) {
            self.bytes_updated += size.unwrap_or(0);
        }
    }

    /// Objects skipped because of a store error.
    pub fn failed_objects(&self) -> usize {
        self.query_failed + self.update_failed
    }

    pub fn has_failures(&self) -> bool {
        self.manifests_failed > 0 || self.failed_objects() > 0
    }

    pub fn write_json(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
