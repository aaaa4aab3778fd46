//! Throttle trait consumed by HTTP clients.

use async_trait::async_trait;
use http::HeaderMap;

use crate::error::Result;

/// Trait for request throttles.
///
/// An HTTP client holds an `Arc<dyn RequestThrottle>` and calls
/// [`limit`](Self::limit) before each request and [`update`](Self::update)
/// after each response, without depending on how limits are learned.
#[async_trait]
pub trait RequestThrottle: Send + Sync {
    /// Wait until a request for `path` may be sent.
    async fn limit(&self, path: &str) -> Result<()>;

    /// Learn from the headers of a response to a request for `path`.
    fn update(&self, path: &str, headers: &HeaderMap);
}
