//! Configuration management for the throttle.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Result, ThrottleError};

/// Main configuration for a [`Ratelimiter`](crate::ratelimit::Ratelimiter).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Names of the response headers carrying rate limit information
    #[serde(default)]
    pub headers: HeaderConfig,

    /// Route key normalization settings
    #[serde(default)]
    pub routes: RouteConfig,
}

/// Response header names.
///
/// Lookups are case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// Header naming the server-side bucket
    #[serde(default = "default_bucket_header")]
    pub bucket: String,

    /// Header carrying the bucket capacity
    #[serde(default = "default_limit_header")]
    pub limit: String,

    /// Header carrying the seconds until the bucket fully resets
    #[serde(default = "default_reset_after_header")]
    pub reset_after: String,

    /// Header flagging a global rate limit
    #[serde(default = "default_global_header")]
    pub global: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket_header(),
            limit: default_limit_header(),
            reset_after: default_reset_after_header(),
            global: default_global_header(),
        }
    }
}

fn default_bucket_header() -> String {
    "X-RateLimit-Bucket".to_string()
}

fn default_limit_header() -> String {
    "X-RateLimit-Limit".to_string()
}

fn default_reset_after_header() -> String {
    "X-RateLimit-Reset-After".to_string()
}

fn default_global_header() -> String {
    "X-RateLimit-Global".to_string()
}

/// Route key normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Number of leading path segments dropped before building a key
    #[serde(default = "default_skip_segments")]
    pub skip_segments: usize,

    /// Segments after which the next snowflake is kept in the key
    #[serde(default = "default_major_keywords")]
    pub major_keywords: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            skip_segments: default_skip_segments(),
            major_keywords: default_major_keywords(),
        }
    }
}

fn default_skip_segments() -> usize {
    2
}

fn default_major_keywords() -> Vec<String> {
    vec![
        "channel".to_string(),
        "guild".to_string(),
        "webhooks".to_string(),
    ]
}

impl ThrottleConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading throttle configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ThrottleError::Config(format!("Failed to parse throttle config: {}", e)))
    }
}
