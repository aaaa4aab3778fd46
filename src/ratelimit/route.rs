//! Route key generation.
//!
//! A route key identifies an endpoint by its shape. Variable resource ids are
//! collapsed so requests to the same endpoint on different resources share a
//! key, except for the first id following a major keyword, which the server
//! uses to split buckets.

use regex::Regex;
use std::collections::HashSet;

use crate::config::RouteConfig;

/// Segments matching this are treated as resource ids.
const SNOWFLAKE_PATTERN: &str = "[0-9]{17,19}";

/// Separator placed between retained segments.
const KEY_SEPARATOR: &str = ":";

/// A key that identifies a route family.
///
/// Only ever used for lookups, never parsed back into a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey(String);

impl RouteKey {
    /// Create a route key from an already-normalized string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps request paths to route keys.
#[derive(Debug, Clone)]
pub struct RouteNormalizer {
    snowflake: Regex,
    skip_segments: usize,
    major_keywords: HashSet<String>,
}

impl RouteNormalizer {
    /// Create a normalizer from route configuration.
    pub fn new(config: &RouteConfig) -> Self {
        Self {
            // The pattern is a compile-time constant.
            snowflake: Regex::new(SNOWFLAKE_PATTERN).expect("snowflake pattern is valid"),
            skip_segments: config.skip_segments,
            major_keywords: config.major_keywords.iter().cloned().collect(),
        }
    }

    /// Whether a path segment holds a resource id.
    ///
    /// The match is unanchored: any segment containing a run of 17 to 19
    /// digits counts.
    pub fn is_snowflake(&self, segment: &str) -> bool {
        self.snowflake.is_match(segment)
    }

    /// Normalize a request path into its route key.
    pub fn normalize(&self, path: &str) -> RouteKey {
        let mut keep_next_id = true;
        let mut parts: Vec<&str> = Vec::new();

        for segment in path.split('/').skip(self.skip_segments) {
            if self.is_snowflake(segment) {
                if keep_next_id {
                    parts.push(segment);
                    keep_next_id = false;
                }
            } else {
                parts.push(segment);
                if self.major_keywords.contains(segment) {
                    keep_next_id = true;
                }
            }
        }

        RouteKey(parts.join(KEY_SEPARATOR))
    }
}

impl Default for RouteNormalizer {
    fn default() -> Self {
        Self::new(&RouteConfig::default())
    }
}

/// Normalize a path with the default route configuration.
pub fn normalize(path: &str) -> RouteKey {
    RouteNormalizer::default().normalize(path)
}
