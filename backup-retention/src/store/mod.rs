//! Object store capabilities consumed by the reconciler.
//!
//! The reconciler only ever lists keys, reads manifest bodies, and reads or
//! writes per-object retention. Anything that can do those four things can be
//! plugged in behind [`ObjectStore`]; the production implementation is
//! [`s3::S3Store`].

pub mod s3;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Object-lock retention mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMode {
    /// Can be bypassed by principals holding the bypass permission.
    #[default]
    Governance,
    /// Cannot be shortened or removed by anyone until it expires.
    Compliance,
}

impl RetentionMode {
    /// The stricter of two modes. S3 refuses to downgrade compliance to
    /// governance, so an extension keeps whatever is stricter.
    pub fn strongest(self, other: RetentionMode) -> RetentionMode {
        if self == RetentionMode::Compliance || other == RetentionMode::Compliance {
            RetentionMode::Compliance
        } else {
            RetentionMode::Governance
        }
    }
}

impl fmt::Display for RetentionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionMode::Governance => write!(f, "governance"),
            RetentionMode::Compliance => write!(f, "compliance"),
        }
    }
}

impl std::str::FromStr for RetentionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "governance" => Ok(RetentionMode::Governance),
            "compliance" => Ok(RetentionMode::Compliance),
            other => Err(format!("unknown retention mode '{}' (expected governance or compliance)", other)),
        }
    }
}

/// Current retention state of one object as reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectRetention {
    pub mode: Option<RetentionMode>,
    pub retain_until: Option<DateTime<Utc>>,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next_token: Option<String>,
    pub truncated: bool,
}

/// Store failures, reduced to the cases the reconciler acts on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("no object lock configuration on {0}")]
    NoRetentionConfigured(String),

    #[error("{operation} failed: {detail}")]
    Other { operation: &'static str, detail: String },
}

impl StoreError {
    pub fn other(operation: &'static str, detail: impl Into<String>) -> Self {
        StoreError::Other {
            operation,
            detail: detail.into(),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of keys under `prefix`, continuing from `token`.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ListPage, StoreError>;

    /// Read a whole object body.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    /// Read the retention currently applied to `key`.
    ///
    /// Fails with [`StoreError::NoRetentionConfigured`] when the object never
    /// had a window set and [`StoreError::NotFound`] when it does not exist.
    async fn get_retention(&self, bucket: &str, key: &str) -> Result<ObjectRetention, StoreError>;

    /// Apply a retention window to `key`.
    async fn put_retention(
        &self,
        bucket: &str,
        key: &str,
        mode: RetentionMode,
        until: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
