//! Custom error types for the retention tool.

use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Discovery failed for prefix {prefix}: {source}")]
    Discovery {
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("Manifest decode error: {0}")]
    Decode(String),

    #[error("Invalid manifest path: {0}")]
    Path(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RetentionError>;
