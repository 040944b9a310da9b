//! Utility modules for the retention tool.

pub mod errors;
pub mod logger;
pub mod shutdown;

pub use errors::{RetentionError, Result};
