//! Rate limit discovery and enforcement.

mod backend;
mod bucket;
mod global;
mod limiter;
mod registry;
mod route;

pub use backend::RequestThrottle;
pub use bucket::{Reservation, TokenBucket};
pub use global::GlobalGate;
pub use limiter::Ratelimiter;
pub use registry::{BucketRegistry, RateLimitHeaders};
pub use route::{normalize, RouteKey, RouteNormalizer};
