//! S3 implementation of [`ObjectStore`] on top of `aws-sdk-s3`.
//!
//! Credentials and region come from the default AWS provider chain. Error
//! codes are mapped to [`StoreError`] here and nowhere else.

use super::{ListPage, ObjectRetention, ObjectStore, RetentionMode, StoreError};
use crate::config::S3Config;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::DateTime as S3DateTime;
use aws_sdk_s3::types::{ObjectLockRetention, ObjectLockRetentionMode};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NotFound"];
const NO_LOCK_CODES: &[&str] = &[
    "NoSuchObjectLockConfiguration",
    "ObjectLockConfigurationNotFoundError",
];

pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from the default credential chain plus the overrides in `config`.
    pub async fn connect(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts));

        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        debug!(
            region = ?shared.region(),
            endpoint = ?config.endpoint,
            max_attempts = config.max_attempts,
            "S3 client configured"
        );

        Self::from_client(Client::from_conf(s3_config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(token.map(str::to_string))
            .send()
            .await
            .map_err(|e| classify("ListObjectsV2", prefix, e))?;

        Ok(ListPage {
            keys: resp
                .contents()
                .iter()
                .filter_map(|obj| obj.key().map(str::to_string))
                .collect(),
            next_token: resp.next_continuation_token().map(str::to_string),
            truncated: resp.is_truncated().unwrap_or(false),
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("GetObject", key, e))?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::other("GetObject", format!("reading body of {}: {}", key, e)))?;

        Ok(body.into_bytes())
    }

    async fn get_retention(&self, bucket: &str, key: &str) -> Result<ObjectRetention, StoreError> {
        let resp = self
            .client
            .get_object_retention()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("GetObjectRetention", key, e))?;

        let Some(retention) = resp.retention() else {
            return Ok(ObjectRetention::default());
        };

        let mode = match retention.mode() {
            Some(ObjectLockRetentionMode::Governance) => Some(RetentionMode::Governance),
            Some(ObjectLockRetentionMode::Compliance) => Some(RetentionMode::Compliance),
            _ => None,
        };
        let retain_until = retention
            .retain_until_date()
            .and_then(|d| DateTime::<Utc>::from_timestamp(d.secs(), d.subsec_nanos()));

        Ok(ObjectRetention { mode, retain_until })
    }

    async fn put_retention(
        &self,
        bucket: &str,
        key: &str,
        mode: RetentionMode,
        until: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let retention = ObjectLockRetention::builder()
            .mode(match mode {
                RetentionMode::Governance => ObjectLockRetentionMode::Governance,
                RetentionMode::Compliance => ObjectLockRetentionMode::Compliance,
            })
            .retain_until_date(S3DateTime::from_secs_and_nanos(
                until.timestamp(),
                until.timestamp_subsec_nanos(),
            ))
            .build();

        self.client
            .put_object_retention()
            .bucket(bucket)
            .key(key)
            .retention(retention)
            .send()
            .await
            .map_err(|e| classify("PutObjectRetention", key, e))?;

        Ok(())
    }
}

/// Map an SDK failure onto the closed [`StoreError`] set.
fn classify<E>(operation: &'static str, key: &str, err: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_string);
    let status = err.raw_response().map(|r| r.status().as_u16());

    match classify_code(code.as_deref(), status) {
        Some(ErrorKind::NotFound) => StoreError::NotFound(key.to_string()),
        Some(ErrorKind::NoLock) => StoreError::NoRetentionConfigured(key.to_string()),
        None => StoreError::other(operation, format!("{}: {}", key, DisplayErrorContext(&err))),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ErrorKind {
    NotFound,
    NoLock,
}

fn classify_code(code: Option<&str>, status: Option<u16>) -> Option<ErrorKind> {
    match code {
        Some(c) if NO_LOCK_CODES.contains(&c) => Some(ErrorKind::NoLock),
        Some(c) if NOT_FOUND_CODES.contains(&c) => Some(ErrorKind::NotFound),
        // HEAD-style 404s come back without a code
        None if status == Some(404) => Some(ErrorKind::NotFound),
        _ => None,
    }
}
