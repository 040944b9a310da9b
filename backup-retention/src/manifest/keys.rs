//! Storage key resolution for manifest-referenced files.
//!
//! Medusa stores SSTables once per host under `{cluster}/{host}/data/...` and
//! every backup's manifest points into that shared directory. Older manifests
//! record paths relative to the host directory; newer ones record the full
//! key. Both are handled without configuration.

use crate::utils::errors::{Result, RetentionError};

/// Minimum number of `/`-separated segments in a manifest key.
const MIN_MANIFEST_SEGMENTS: usize = 4;

/// Extract the `{cluster}/{host}/` prefix from a manifest key.
///
/// # Example
/// ```
/// use backup_retention::manifest::keys::resolve_hostname_path;
///
/// let prefix = resolve_hostname_path("prod/node-1/backup-2024/meta/manifest.json").unwrap();
/// assert_eq!(prefix, "prod/node-1/");
/// ```
pub fn resolve_hostname_path(manifest_key: &str) -> Result<String> {
    let parts: Vec<&str> = manifest_key.split('/').collect();
    if parts.len() < MIN_MANIFEST_SEGMENTS {
        return Err(RetentionError::Path(format!(
            "manifest key '{}' has {} segment(s), expected at least {}",
            manifest_key,
            parts.len(),
            MIN_MANIFEST_SEGMENTS
        )));
    }

    Ok(format!("{}/{}/", parts[0], parts[1]))
}

/// Absolute key for a path referenced from a manifest under `hostname_path`.
///
/// The prefix check is textual: a relative path that happens to start with
/// the hostname prefix is taken as already absolute.
pub fn resolve_object_key(hostname_path: &str, referenced_path: &str) -> String {
    if referenced_path.starts_with(hostname_path) {
        referenced_path.to_string()
    } else {
        format!("{}{}", hostname_path, referenced_path)
    }
}
