//! Discovered bucket state.
//!
//! Buckets and route mappings are learned from response headers and kept for
//! the life of the registry. Nothing is ever evicted.

use http::HeaderMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::bucket::TokenBucket;
use super::global::GlobalGate;
use super::route::{RouteKey, RouteNormalizer};
use crate::config::{HeaderConfig, ThrottleConfig};

/// Rate limit values read from one response.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitHeaders {
    /// Server-assigned bucket id, if the response named one
    pub bucket: Option<String>,
    /// Bucket capacity
    pub limit: i64,
    /// Seconds until the bucket fully resets
    pub reset_after: f64,
    /// Whether the response signals a global rate limit
    pub global: bool,
}

impl RateLimitHeaders {
    /// Read rate limit values from response headers.
    ///
    /// Returns `None` when the limit or reset-after header is missing or does
    /// not parse; such responses carry no usable information.
    pub fn from_header_map(headers: &HeaderMap, names: &HeaderConfig) -> Option<Self> {
        let limit = header_text(headers, &names.limit)?.trim().parse::<i64>().ok()?;
        let reset_after = header_text(headers, &names.reset_after)?.trim().parse::<f64>().ok()?;
        let bucket = header_text(headers, &names.bucket)
            .filter(|b| !b.is_empty())
            .map(str::to_string);
        let global = header_text(headers, &names.global).is_some_and(|g| !g.is_empty());

        Some(Self {
            bucket,
            limit,
            reset_after,
            global,
        })
    }

    /// Bucket capacity, with negative limits clamped to zero.
    pub fn capacity(&self) -> u32 {
        u32::try_from(self.limit.max(0)).unwrap_or(u32::MAX)
    }

    /// Time for the bucket to refill completely.
    pub fn refill_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.reset_after).unwrap_or(Duration::ZERO)
    }
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[derive(Debug, Default)]
struct RegistryState {
    buckets: HashMap<String, Arc<TokenBucket>>,
    routes: HashMap<RouteKey, String>,
}

/// Registry of discovered buckets and the routes that use them.
///
/// This struct is thread-safe and can be shared across multiple tasks.
#[derive(Debug)]
pub struct BucketRegistry {
    state: RwLock<RegistryState>,
    normalizer: RouteNormalizer,
    headers: HeaderConfig,
    global: GlobalGate,
}

impl BucketRegistry {
    /// Create an empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(&ThrottleConfig::default())
    }

    /// Create an empty registry from configuration.
    pub fn with_config(config: &ThrottleConfig) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            normalizer: RouteNormalizer::new(&config.routes),
            headers: config.headers.clone(),
            global: GlobalGate::new(),
        }
    }

    /// The global gate fed by this registry.
    pub fn global(&self) -> &GlobalGate {
        &self.global
    }

    /// The normalizer used to turn paths into route keys.
    pub fn normalizer(&self) -> &RouteNormalizer {
        &self.normalizer
    }

    /// Whether a bucket with this id has been discovered.
    pub fn bucket_exists(&self, id: &str) -> bool {
        self.state.read().buckets.contains_key(id)
    }

    /// Whether a route key has been mapped to a bucket.
    pub fn mapping_exists(&self, route_key: &RouteKey) -> bool {
        self.state.read().routes.contains_key(route_key)
    }

    /// Get the bucket a route key is mapped to.
    pub fn bucket_for(&self, route_key: &RouteKey) -> Option<String> {
        self.state.read().routes.get(route_key).cloned()
    }

    /// Create a bucket unless one with this id already exists.
    ///
    /// A new bucket starts one token short of full, because the response that
    /// revealed it was itself a request against it. Returns `true` if the
    /// bucket was created.
    pub fn create_bucket(&self, id: &str, refill_interval: Duration, capacity: u32) -> bool {
        if self.bucket_exists(id) {
            return false;
        }

        let mut state = self.state.write();
        if state.buckets.contains_key(id) {
            return false;
        }

        debug!(
            bucket = %id,
            capacity,
            refill_interval = ?refill_interval,
            "Creating new rate limit bucket"
        );
        let bucket = TokenBucket::new(capacity, refill_interval);
        bucket.reserve();
        state.buckets.insert(id.to_string(), Arc::new(bucket));
        true
    }

    /// Map a route key to a bucket unless it is already mapped.
    ///
    /// Returns `true` if the mapping was created.
    pub fn create_mapping(&self, route_key: RouteKey, id: &str) -> bool {
        if self.mapping_exists(&route_key) {
            return false;
        }

        let mut state = self.state.write();
        if state.routes.contains_key(&route_key) {
            return false;
        }

        debug!(route = %route_key, bucket = %id, "Adding route mapping");
        state.routes.insert(route_key, id.to_string());
        true
    }

    /// Find the bucket that governs a request path.
    pub fn lookup(&self, path: &str) -> Option<(Arc<TokenBucket>, String)> {
        let route_key = self.normalizer.normalize(path);
        let state = self.state.read();
        let id = state.routes.get(&route_key)?;
        let bucket = state.buckets.get(id)?;
        Some((Arc::clone(bucket), id.clone()))
    }

    /// Learn from the headers of a response to a request for `path`.
    pub fn update_from_headers(&self, path: &str, headers: &HeaderMap) {
        match RateLimitHeaders::from_header_map(headers, &self.headers) {
            Some(limits) => self.apply_response(path, &limits),
            None => trace!(path = %path, "Response carried no usable rate limit headers"),
        }
    }

    /// Learn from rate limit values of a response to a request for `path`.
    pub fn apply_response(&self, path: &str, limits: &RateLimitHeaders) {
        if limits.global {
            self.global.signal(limits.reset_after);
            return;
        }

        let Some(id) = limits.bucket.as_deref() else {
            trace!(path = %path, "Response did not name a bucket");
            return;
        };

        self.create_bucket(id, limits.refill_interval(), limits.capacity());
        self.create_mapping(self.normalizer.normalize(path), id);
    }

    /// Get the number of discovered buckets.
    pub fn bucket_count(&self) -> usize {
        self.state.read().buckets.len()
    }

    /// Get the number of mapped routes.
    pub fn route_count(&self) -> usize {
        self.state.read().routes.len()
    }
}

impl Default for BucketRegistry {
    fn default() -> Self {
        Self::new()
    }
}
