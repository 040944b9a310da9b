//! In-memory [`ObjectStore`] for tests.

use super::{ListPage, ObjectRetention, ObjectStore, RetentionMode, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutCall {
    pub key: String,
    pub mode: RetentionMode,
    pub until: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, Bytes>,
    retention: HashMap<String, ObjectRetention>,
    /// Keys whose retention query reports "no lock configuration"
    no_lock: HashSet<String>,
    query_failures: HashSet<String>,
    put_failures: HashSet<String>,
    get_failures: HashSet<String>,
    list_failure: Option<String>,
    puts: Vec<PutCall>,
    list_calls: usize,
}

/// Keys are listed in lexical order, `page_size` per page.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size: page_size.max(1),
        }
    }

    pub fn insert(&self, key: &str, body: impl Into<Bytes>) {
        self.inner.lock().unwrap().objects.insert(key.to_string(), body.into());
    }

    pub fn set_retention(&self, key: &str, until: DateTime<Utc>) {
        self.inner.lock().unwrap().retention.insert(
            key.to_string(),
            ObjectRetention {
                mode: Some(RetentionMode::Governance),
                retain_until: Some(until),
            },
        );
    }

    pub fn set_no_lock(&self, key: &str) {
        self.inner.lock().unwrap().no_lock.insert(key.to_string());
    }

    pub fn fail_query(&self, key: &str) {
        self.inner.lock().unwrap().query_failures.insert(key.to_string());
    }

    pub fn fail_put(&self, key: &str) {
        self.inner.lock().unwrap().put_failures.insert(key.to_string());
    }

    pub fn fail_get(&self, key: &str) {
        self.inner.lock().unwrap().get_failures.insert(key.to_string());
    }

    pub fn fail_list(&self, detail: &str) {
        self.inner.lock().unwrap().list_failure = Some(detail.to_string());
    }

    pub fn retention_of(&self, key: &str) -> Option<DateTime<Utc>> {
        self.inner
            .lock()
            .unwrap()
            .retention
            .get(key)
            .and_then(|r| r.retain_until)
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.inner.lock().unwrap().puts.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.inner.lock().unwrap().list_calls
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(
        &self,
        _bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_calls += 1;
        if let Some(detail) = &inner.list_failure {
            return Err(StoreError::other("ListObjectsV2", detail.clone()));
        }

        let start: usize = match token {
            Some(t) => t
                .parse()
                .map_err(|_| StoreError::other("ListObjectsV2", format!("bad token {}", t)))?,
            None => 0,
        };

        let matching: Vec<String> = inner
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        let end = (start + self.page_size).min(matching.len());
        let truncated = end < matching.len();

        Ok(ListPage {
            keys: matching[start.min(end)..end].to_vec(),
            next_token: truncated.then(|| end.to_string()),
            truncated,
        })
    }

    async fn get(&self, _bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.get_failures.contains(key) {
            return Err(StoreError::other("GetObject", format!("{}: AccessDenied", key)));
        }
        inner
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn get_retention(&self, _bucket: &str, key: &str) -> Result<ObjectRetention, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.query_failures.contains(key) {
            return Err(StoreError::other("GetObjectRetention", format!("{}: AccessDenied", key)));
        }
        if inner.no_lock.contains(key) {
            return Err(StoreError::NoRetentionConfigured(key.to_string()));
        }
        if let Some(retention) = inner.retention.get(key) {
            return Ok(retention.clone());
        }
        if inner.objects.contains_key(key) {
            Ok(ObjectRetention::default())
        } else {
            Err(StoreError::NotFound(key.to_string()))
        }
    }

    async fn put_retention(
        &self,
        _bucket: &str,
        key: &str,
        mode: RetentionMode,
        until: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.put_failures.contains(key) {
            return Err(StoreError::other(
                "PutObjectRetention",
                format!("{}: InvalidRequest: Bucket is missing Object Lock Configuration", key),
            ));
        }
        inner.puts.push(PutCall {
            key: key.to_string(),
            mode,
            until,
        });
        inner.no_lock.remove(key);
        inner.retention.insert(
            key.to_string(),
            ObjectRetention {
                mode: Some(mode),
                retain_until: Some(until),
            },
        );
        Ok(())
    }
}
