//! Bucketgate - Adaptive Client-Side Rate Limiting
//!
//! This crate throttles outgoing requests to an API that reports its rate
//! limits through response headers. Buckets are discovered from the first
//! response on each route and enforced locally before later requests are
//! sent. A global cooldown signalled by the server pauses all traffic.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use config::ThrottleConfig;
pub use error::{Result, ThrottleError};
pub use ratelimit::{Ratelimiter, RequestThrottle};
