//! Backup Retention Library
//!
//! Extends S3 object-lock retention on every file referenced by the Medusa
//! backup manifests of a Cassandra cluster.

pub mod config;
pub mod executor;
pub mod manifest;
pub mod retention;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::{ReconcileOptions, Reconciler};
pub use utils::errors::RetentionError;
pub type Result<T> = std::result::Result<T, RetentionError>;
