//! Runtime configuration read from the environment
//!
//! Every value has a documented default except the population API URL,
//! which is only required by the publish step and is validated there.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};

pub const DEFAULT_BASE_URL: &str = "https://download.bls.gov/pub/time.series/pr/";
pub const DEFAULT_BUCKET: &str = "rearc-bls-republish-2026";
pub const DEFAULT_PREFIX: &str = "bls/pr/";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (bls-mirror)";
pub const DEFAULT_POP_KEY: &str = "bls/api/population.json";
pub const DEFAULT_PR_CURRENT_KEY: &str = "bls/pr/pr.data.0.Current";
pub const DEFAULT_SERIES_ID: &str = "PRS30006032";
pub const DEFAULT_PERIOD: &str = "Q01";

/// Path fragment that identifies the listed directory inside absolute links
pub const DEFAULT_LISTING_FRAGMENT: &str = "/pub/time.series/pr/";
/// File uploaded ahead of every other file in a run
pub const DEFAULT_PRIMARY_FILE: &str = "pr.data.0.Current";

pub const LISTING_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONTENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for the ingest side (directory sync and resource publish)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub base_url: String,
    pub bucket: String,
    pub prefix: String,
    pub region: String,
    pub user_agent: String,
    /// 0 = unlimited
    pub max_files: usize,
    pub pop_api_url: Option<String>,
    pub pop_key: String,
    /// S3-compatible endpoint override (MinIO, R2, localstack)
    pub endpoint_url: Option<String>,
    pub listing_fragment: String,
    pub primary_file: Option<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            region: DEFAULT_REGION.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_files: 0,
            pop_api_url: None,
            pop_key: DEFAULT_POP_KEY.to_string(),
            endpoint_url: None,
            listing_fragment: DEFAULT_LISTING_FRAGMENT.to_string(),
            primary_file: Some(DEFAULT_PRIMARY_FILE.to_string()),
        }
    }
}

impl MirrorConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build config from an arbitrary variable lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_files = match lookup("MAX_FILES") {
            Some(raw) => parse_max_files(&raw)?,
            None => defaults.max_files,
        };

        Ok(Self {
            base_url: lookup("BASE_URL").unwrap_or(defaults.base_url),
            bucket: lookup("S3_BUCKET").unwrap_or(defaults.bucket),
            prefix: lookup("S3_PREFIX").unwrap_or(defaults.prefix),
            region: lookup("AWS_REGION").unwrap_or(defaults.region),
            user_agent: lookup("USER_AGENT").unwrap_or(defaults.user_agent),
            max_files,
            pop_api_url: lookup("POP_API_URL").filter(|s| !s.trim().is_empty()),
            pop_key: lookup("POP_S3_KEY").unwrap_or(defaults.pop_key),
            endpoint_url: lookup("S3_ENDPOINT_URL").filter(|s| !s.trim().is_empty()),
            listing_fragment: defaults.listing_fragment,
            primary_file: defaults.primary_file,
        })
    }

    /// The population API URL, or a configuration error if unset
    pub fn require_pop_api_url(&self) -> Result<&str> {
        self.pop_api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| MirrorError::Config("POP_API_URL is not set".to_string()))
    }
}

fn parse_max_files(raw: &str) -> Result<usize> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<usize>()
        .map_err(|_| MirrorError::Config(format!("MAX_FILES must be a non-negative integer, got {:?}", raw)))
}

/// Settings for the report step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub pr_current_key: String,
    pub pop_key: String,
    pub series_id: String,
    pub period: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            pr_current_key: DEFAULT_PR_CURRENT_KEY.to_string(),
            pop_key: DEFAULT_POP_KEY.to_string(),
            series_id: DEFAULT_SERIES_ID.to_string(),
            period: DEFAULT_PERIOD.to_string(),
        }
    }
}

impl ReportConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bucket: lookup("S3_BUCKET").unwrap_or(defaults.bucket),
            region: lookup("AWS_REGION").unwrap_or(defaults.region),
            endpoint_url: lookup("S3_ENDPOINT_URL").filter(|s| !s.trim().is_empty()),
            pr_current_key: lookup("PR_CURRENT_KEY").unwrap_or(defaults.pr_current_key),
            pop_key: lookup("POP_S3_KEY").unwrap_or(defaults.pop_key),
            series_id: lookup("SERIES_ID").unwrap_or(defaults.series_id),
            period: lookup("PERIOD").unwrap_or(defaults.period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = MirrorConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.prefix, "bls/pr/");
        assert_eq!(config.max_files, 0);
        assert!(config.pop_api_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = MirrorConfig::from_lookup(lookup_from(&[
            ("S3_BUCKET", "other"),
            ("MAX_FILES", "5"),
            ("POP_API_URL", "https://example.test/pop"),
        ]))
        .unwrap();
        assert_eq!(config.bucket, "other");
        assert_eq!(config.max_files, 5);
        assert_eq!(config.require_pop_api_url().unwrap(), "https://example.test/pop");
    }

    #[test]
    fn test_bad_max_files_is_config_error() {
        let err = MirrorConfig::from_lookup(lookup_from(&[("MAX_FILES", "lots")])).unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }

    #[test]
    fn test_missing_pop_url_is_config_error() {
        let config = MirrorConfig::from_lookup(lookup_from(&[("POP_API_URL", "  ")])).unwrap();
        assert!(matches!(
            config.require_pop_api_url(),
            Err(MirrorError::Config(_))
        ));
    }

    #[test]
    fn test_report_config_overrides() {
        let config = ReportConfig::from_lookup(lookup_from(&[("SERIES_ID", "PRS1"), ("PERIOD", "Q02")]));
        assert_eq!(config.series_id, "PRS1");
        assert_eq!(config.period, "Q02");
        assert_eq!(config.pop_key, DEFAULT_POP_KEY);
    }
}
