//! Configuration management for the retention tool.
//!
//! Loads an optional TOML file, overlays `BACKUP_RETENTION__SECTION__KEY`
//! environment variables, and leaves the final say to command-line flags
//! (applied in `main`).

use crate::retention::RetentionPolicy;
use crate::store::RetentionMode;
use crate::utils::errors::{Result, RetentionError};
use ::config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "BACKUP_RETENTION";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub s3: S3Config,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Bucket holding the Medusa backups
    #[serde(default)]
    pub bucket: String,

    /// Cluster name, used as the listing prefix
    #[serde(default)]
    pub cluster: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Protect every object for this many days from now
    #[serde(default)]
    pub retention_days: Option<i64>,

    /// Extend objects whose protection ends within this many days...
    #[serde(default)]
    pub min_retention_days: Option<i64>,

    /// ...to this many days from now
    #[serde(default)]
    pub max_retention_days: Option<i64>,

    /// Object lock mode requested on update
    #[serde(default)]
    pub mode: RetentionMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Region override (default: provider chain)
    #[serde(default)]
    pub region: Option<String>,

    /// Endpoint override for S3-compatible stores
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub force_path_style: bool,

    /// Attempts per request, including the first (standard retry mode)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Log intended updates without issuing them
    #[serde(default)]
    pub dry_run: bool,

    /// Objects checked concurrently within one manifest
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Write the run summary as JSON to this file
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_max_attempts() -> u32 {
    5
}

fn default_concurrency() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            force_path_style: false,
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: default_concurrency(),
            summary_path: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl RetentionConfig {
    /// The configured policy shape. Exactly one of `retention_days` or the
    /// min/max pair must be set.
    pub fn policy(&self) -> Result<RetentionPolicy> {
        let policy = match (self.retention_days, self.min_retention_days, self.max_retention_days) {
            (Some(retention_days), None, None) => RetentionPolicy::Fixed { retention_days },
            (None, Some(min_retention_days), Some(max_retention_days)) => RetentionPolicy::Window {
                min_retention_days,
                max_retention_days,
            },
            (None, None, None) => {
                return Err(RetentionError::Config(
                    "a retention policy is required: set retention days or min/max retention days"
                        .to_string(),
                ))
            }
            (Some(_), _, _) => {
                return Err(RetentionError::Config(
                    "retention days cannot be combined with min/max retention days".to_string(),
                ))
            }
            (None, _, _) => {
                return Err(RetentionError::Config(
                    "min and max retention days must be set together".to_string(),
                ))
            }
        };

        policy.validate()?;
        Ok(policy)
    }
}

impl Config {
    /// Load configuration from an optional TOML file plus environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        Self::build(builder)
    }

    /// Load configuration from TOML text plus environment overrides.
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::build(::config::Config::builder().add_source(File::from_str(content, FileFormat::Toml)))
    }

    fn build(
        builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<Self> {
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| RetentionError::Config(e.to_string()))
    }

    /// Check that everything a run needs is present and consistent.
    pub fn validate(&self) -> Result<()> {
        if self.target.bucket.trim().is_empty() {
            return Err(RetentionError::Config("bucket is required".to_string()));
        }
        if self.target.cluster.trim().is_empty() {
            return Err(RetentionError::Config("cluster is required".to_string()));
        }
        if self.run.concurrency == 0 {
            return Err(RetentionError::Config("concurrency must be at least 1".to_string()));
        }
        if self.s3.max_attempts == 0 {
            return Err(RetentionError::Config("max_attempts must be at least 1".to_string()));
        }
        self.retention.policy()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid() -> Config {
        let mut config = Config::default();
        config.target.bucket = "backups".to_string();
        config.target.cluster = "links".to_string();
        config.retention.retention_days = Some(30);
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.run.concurrency, 1);
        assert!(!config.run.dry_run);
        assert_eq!(config.s3.max_attempts, 5);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.retention.mode, RetentionMode::Governance);
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"
[target]
bucket = "medusa-backups"
cluster = "links"

[retention]
min_retention_days = 7
max_retention_days = 30
mode = "compliance"

[s3]
endpoint = "http://localhost:9000"
force_path_style = true

[run]
dry_run = true
concurrency = 8
"#
        )?;

        let config = Config::load(Some(file.path()))?;
        assert_eq!(config.target.bucket, "medusa-backups");
        assert_eq!(config.target.cluster, "links");
        assert_eq!(config.retention.mode, RetentionMode::Compliance);
        assert_eq!(
            config.retention.policy()?,
            RetentionPolicy::Window {
                min_retention_days: 7,
                max_retention_days: 30
            }
        );
        assert_eq!(config.s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.s3.force_path_style);
        assert_eq!(config.s3.max_attempts, 5);
        assert!(config.run.dry_run);
        assert_eq!(config.run.concurrency, 8);
        assert_eq!(config.log.level, "info");
        config.validate()
    }

    #[test]
    fn test_load_without_file_uses_defaults() -> Result<()> {
        let config = Config::load(None)?;
        assert_eq!(config.run.concurrency, 1);
        Ok(())
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        let result = Config::from_toml("[retention]\nmode = \"forever\"\n");
        assert!(matches!(result, Err(RetentionError::Config(_))));
    }

    #[test]
    fn test_validate_requires_target() {
        let mut config = valid();
        config.target.bucket.clear();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.target.cluster = "  ".to_string();
        assert!(config.validate().is_err());

        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_concurrency() {
        let mut config = valid();
        config.run.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_shapes() {
        let mut retention = RetentionConfig::default();
        assert!(retention.policy().is_err());

        retention.retention_days = Some(30);
        assert_eq!(retention.policy().unwrap(), RetentionPolicy::Fixed { retention_days: 30 });

        retention.min_retention_days = Some(7);
        assert!(retention.policy().is_err());

        retention.retention_days = None;
        assert!(retention.policy().is_err());

        retention.max_retention_days = Some(3);
        assert!(retention.policy().is_err());

        retention.max_retention_days = Some(14);
        assert!(retention.policy().is_ok());
    }
}
