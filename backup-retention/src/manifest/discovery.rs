//! Manifest discovery under a cluster prefix.

use super::MANIFEST_SUFFIX;
use crate::store::ObjectStore;
use crate::utils::errors::{Result, RetentionError};
use std::collections::HashSet;
use tracing::debug;

/// Find every manifest key under `{cluster}/`.
///
/// Follows continuation tokens until the listing is exhausted. Keys are
/// de-duplicated; the returned order is unspecified. Any page failure aborts
/// discovery with no partial result.
pub async fn find_manifests<S>(store: &S, bucket: &str, cluster: &str) -> Result<Vec<String>>
where
    S: ObjectStore + ?Sized,
{
    if cluster.is_empty() {
        return Err(RetentionError::Config("cluster name must not be empty".to_string()));
    }

    let prefix = format!("{}/", cluster);
    let mut manifests = HashSet::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store
            .list_page(bucket, &prefix, token.as_deref())
            .await
            .map_err(|source| RetentionError::Discovery {
                prefix: prefix.clone(),
                source,
            })?;
        pages += 1;

        manifests.extend(
            page.keys
                .into_iter()
                .filter(|key| key.ends_with(MANIFEST_SUFFIX)),
        );

        match page.next_token {
            Some(next) if page.truncated => token = Some(next),
            _ => break,
        }
    }

    debug!(prefix = %prefix, pages, manifests = manifests.len(), "Listing complete");

    Ok(manifests.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::{ListPage, ObjectRetention, RetentionMode, StoreError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_find_manifests_excludes_data_files() {
        let store = MemoryStore::new();
        store.insert("links/host1/backup1/meta/manifest.json", "{}");
        store.insert("links/host1/backup2/meta/manifest.json", "{}");
        store.insert("links/host1/data/file.db", "x");
        store.insert("links/host2/backup1/meta/manifest.json", "{}");
        store.insert("links/host2/backup1/meta/schema.cql", "x");
        store.insert("other/host1/backup1/meta/manifest.json", "{}");

        let found = find_manifests(&store, "bucket", "links").await.unwrap();
        assert_eq!(
            sorted(found),
            vec![
                "links/host1/backup1/meta/manifest.json",
                "links/host1/backup2/meta/manifest.json",
                "links/host2/backup1/meta/manifest.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_find_manifests_follows_pagination() {
        let store = MemoryStore::with_page_size(2);
        store.insert("cluster1/host1/backup1/meta/manifest.json", "{}");
        store.insert("cluster1/host1/data/a.db", "x");
        store.insert("cluster1/host1/data/b.db", "x");
        store.insert("cluster1/host2/backup1/meta/manifest.json", "{}");
        store.insert("cluster1/host2/data/c.db", "x");

        let found = find_manifests(&store, "bucket", "cluster1").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(store.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_find_manifests_empty_listing() {
        let store = MemoryStore::new();
        let found = find_manifests(&store, "bucket", "empty").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_manifests_list_error_is_fatal() {
        let store = MemoryStore::new();
        store.insert("c/h/b/meta/manifest.json", "{}");
        store.fail_list("AccessDenied");

        let err = find_manifests(&store, "bucket", "c").await.unwrap_err();
        assert!(matches!(err, RetentionError::Discovery { .. }));
    }

    #[tokio::test]
    async fn test_find_manifests_rejects_empty_cluster() {
        let store = MemoryStore::new();
        let err = find_manifests(&store, "bucket", "").await.unwrap_err();
        assert!(matches!(err, RetentionError::Config(_)));
        assert_eq!(store.list_calls(), 0);
    }

    /// Returns the same page twice before finishing, as a retried page would.
    struct OverlappingPages {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ObjectStore for OverlappingPages {
        async fn list_page(
            &self,
            _bucket: &str,
            _prefix: &str,
            _token: Option<&str>,
        ) -> std::result::Result<ListPage, StoreError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            Ok(ListPage {
                keys: vec!["c/h1/b1/meta/manifest.json".to_string()],
                next_token: (*calls < 3).then(|| "again".to_string()),
                truncated: *calls < 3,
            })
        }

        async fn get(&self, _bucket: &str, key: &str) -> std::result::Result<Bytes, StoreError> {
            Err(StoreError::NotFound(key.to_string()))
        }

        async fn get_retention(
            &self,
            _bucket: &str,
            key: &str,
        ) -> std::result::Result<ObjectRetention, StoreError> {
            Err(StoreError::NotFound(key.to_string()))
        }

        async fn put_retention(
            &self,
            _bucket: &str,
            _key: &str,
            _mode: RetentionMode,
            _until: DateTime<Utc>,
        ) -> std::result::Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_find_manifests_deduplicates_overlapping_pages() {
        let store = OverlappingPages { calls: Mutex::new(0) };
        let found = find_manifests(&store, "bucket", "c").await.unwrap();
        assert_eq!(found, vec!["c/h1/b1/meta/manifest.json"]);
    }
}
