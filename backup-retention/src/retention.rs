//! Retention policy: when an object needs a longer window, and how long.

use crate::store::RetentionMode;
use crate::utils::errors::{Result, RetentionError};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Whether an object protected until `current` must be extended to cover `required`.
///
/// Unprotected objects always need an update. An expiry equal to `required`
/// is sufficient.
pub fn needs_update(current: Option<DateTime<Utc>>, required: DateTime<Utc>) -> bool {
    match current {
        None => true,
        Some(until) => until < required,
    }
}

/// Policy shapes accepted from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RetentionPolicy {
    /// Keep every object protected for at least `retention_days` from now.
    Fixed { retention_days: i64 },

    /// Extend to `max_retention_days` only once protection drops below
    /// `min_retention_days`. Batches the updates instead of touching every
    /// object on every run.
    Window {
        min_retention_days: i64,
        max_retention_days: i64,
    },
}

impl RetentionPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            RetentionPolicy::Fixed { retention_days } if retention_days <= 0 => Err(
                RetentionError::Config(format!("retention days must be positive, got {}", retention_days)),
            ),
            RetentionPolicy::Window {
                min_retention_days,
                max_retention_days,
            } => {
                if min_retention_days <= 0 || max_retention_days <= 0 {
                    return Err(RetentionError::Config(format!(
                        "min/max retention days must be positive, got {}/{}",
                        min_retention_days, max_retention_days
                    )));
                }
                if min_retention_days > max_retention_days {
                    return Err(RetentionError::Config(format!(
                        "min retention ({} days) exceeds max retention ({} days)",
                        min_retention_days, max_retention_days
                    )));
                }
                Ok(())
            }
            RetentionPolicy::Fixed { .. } => Ok(()),
        }
    }

    /// Resolve the policy against `now` into absolute timestamps.
    pub fn target(&self, now: DateTime<Utc>, mode: RetentionMode) -> Result<RetentionTarget> {
        self.validate()?;

        let (min_days, max_days) = match *self {
            RetentionPolicy::Fixed { retention_days } => (retention_days, retention_days),
            RetentionPolicy::Window {
                min_retention_days,
                max_retention_days,
            } => (min_retention_days, max_retention_days),
        };

        Ok(RetentionTarget {
            threshold: days_from(now, min_days)?,
            retain_until: days_from(now, max_days)?,
            mode,
        })
    }
}

fn days_from(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| RetentionError::Config(format!("{} days from now is out of range", days)))
}

/// Absolute policy for one run.
///
/// Objects protected until before `threshold` are extended to `retain_until`.
/// `retain_until >= threshold`, so an applied window is never shorter than the
/// one it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionTarget {
    pub threshold: DateTime<Utc>,
    pub retain_until: DateTime<Utc>,
    pub mode: RetentionMode,
}

impl RetentionTarget {
    /// Single-timestamp target: protect until at least `until`.
    pub fn until(until: DateTime<Utc>, mode: RetentionMode) -> Self {
        Self {
            threshold: until,
            retain_until: until,
            mode,
        }
    }

    pub fn needs_update(&self, current: Option<DateTime<Utc>>) -> bool {
        needs_update(current, self.threshold)
    }
}
