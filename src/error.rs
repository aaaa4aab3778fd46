//! Error types for the throttle.

use thiserror::Error;

/// Main error type for throttle operations.
#[derive(Error, Debug)]
pub enum ThrottleError {
    /// The bucket for this route can never grant a reservation under its
    /// learned parameters, so the request must not be sent.
    #[error("Rate limit bucket {bucket} is unavailable")]
    Unavailable {
        /// Server-assigned id of the bucket that refused the reservation
        bucket: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for throttle operations.
pub type Result<T> = std::result::Result<T, ThrottleError>;
