//! Request gating on top of the bucket registry.

use async_trait::async_trait;
use http::HeaderMap;
use std::time::Duration;
use tracing::{debug, trace};

use super::backend::RequestThrottle;
use super::registry::BucketRegistry;
use crate::config::ThrottleConfig;
use crate::error::{Result, ThrottleError};

/// The public throttle for an HTTP client.
///
/// Call [`limit`](Self::limit) before sending a request and
/// [`update`](Self::update) with the headers of every response. This struct
/// is thread-safe and can be shared across multiple tasks.
#[derive(Debug, Default)]
pub struct Ratelimiter {
    registry: BucketRegistry,
}

impl Ratelimiter {
    /// Create a new rate limiter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new rate limiter from configuration.
    pub fn with_config(config: ThrottleConfig) -> Self {
        Self {
            registry: BucketRegistry::with_config(&config),
        }
    }

    /// The registry of learned buckets.
    pub fn registry(&self) -> &BucketRegistry {
        &self.registry
    }

    /// Wait until a request for `path` may be sent.
    ///
    /// The global cooldown is always honored first. Routes without a known
    /// bucket pass straight through. Fails with
    /// [`ThrottleError::Unavailable`] without waiting if the route's bucket
    /// can never grant a reservation.
    pub async fn limit(&self, path: &str) -> Result<()> {
        let global = self.registry.global().reserve();
        wait(global.delay()).await;
        trace!(path = %path, "Got global reservation");

        let Some((bucket, id)) = self.registry.lookup(path) else {
            return Ok(());
        };

        let reservation = bucket.reserve();
        if !reservation.is_ok() {
            debug!(bucket = %id, path = %path, "Bucket cannot grant a reservation");
            return Err(ThrottleError::Unavailable { bucket: id });
        }

        wait(reservation.delay()).await;
        debug!(
            bucket = %id,
            delay = ?reservation.delay(),
            "Got bucket reservation"
        );
        Ok(())
    }

    /// Wait until `request` may be sent.
    pub async fn limit_request<B>(&self, request: &http::Request<B>) -> Result<()> {
        self.limit(request.uri().path()).await
    }

    /// Learn from the headers of a response to a request for `path`.
    pub fn update(&self, path: &str, headers: &HeaderMap) {
        self.registry.update_from_headers(path, headers);
        trace!(path = %path, "Updated from response");
    }

    /// Learn from a response to a request for `path`.
    pub fn update_from_response<B>(&self, path: &str, response: &http::Response<B>) {
        self.update(path, response.headers());
    }
}

async fn wait(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl RequestThrottle for Ratelimiter {
    async fn limit(&self, path: &str) -> Result<()> {
        Ratelimiter::limit(self, path).await
    }

    fn update(&self, path: &str, headers: &HeaderMap) {
        Ratelimiter::update(self, path, headers)
    }
}
