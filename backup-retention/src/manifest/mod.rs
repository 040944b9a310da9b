//! Medusa backup manifests.
//!
//! Every backup generation writes `{cluster}/{host}/{backup}/meta/manifest.json`
//! listing the SSTable files it references. Two body shapes exist in the field:
//!
//! ```json
//! {"objects": [{"path": "data/ks/table/file1.db"}]}
//! ```
//!
//! and the per-table form written by current Medusa releases:
//!
//! ```json
//! [{"keyspace": "ks", "columnfamily": "table", "objects": [{"path": "..."}]}]
//! ```
//!
//! Both decode to the same flat [`Manifest`].

pub mod discovery;
pub mod keys;

use crate::utils::errors::{Result, RetentionError};
use serde::Deserialize;

/// Suffix identifying a manifest document under a cluster prefix.
pub const MANIFEST_SUFFIX: &str = "/meta/manifest.json";

/// One data file referenced by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestObject {
    pub path: String,

    /// Object size in bytes, when the manifest records it
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default, rename = "MD5")]
    pub md5: Option<String>,
}

/// Flattened manifest: every referenced object, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub objects: Vec<ManifestObject>,
}

/// Per-table record; `keyspace` and `columnfamily` are not needed here.
#[derive(Debug, Deserialize)]
struct TableEntry {
    #[serde(default)]
    objects: Vec<ManifestObject>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestDocument {
    Tables(Vec<TableEntry>),
    Flat {
        #[serde(default)]
        objects: Vec<ManifestObject>,
    },
}

impl Manifest {
    /// Decode a manifest body.
    ///
    /// Empty input and malformed JSON are errors. A document with no tables,
    /// or tables with no objects, is a valid empty manifest.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(RetentionError::Decode("empty manifest body".to_string()));
        }

        // Decode to a Value first so syntax errors keep serde_json's line/column message
        let value: serde_json::Value =
            serde_json::from_slice(data).map_err(|e| RetentionError::Decode(e.to_string()))?;

        let document: ManifestDocument = serde_json::from_value(value).map_err(|_| {
            RetentionError::Decode(
                "expected an object with an 'objects' list or a list of table entries".to_string(),
            )
        })?;

        let objects = match document {
            ManifestDocument::Flat { objects } => objects,
            ManifestDocument::Tables(tables) => {
                tables.into_iter().flat_map(|t| t.objects).collect()
            }
        };

        Ok(Self { objects })
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Sum of recorded object sizes; objects without a size count as zero.
    pub fn total_bytes(&self) -> u64 {
        self.objects.iter().filter_map(|o| o.size).sum()
    }
}
