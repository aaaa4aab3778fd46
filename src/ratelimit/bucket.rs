//! Token bucket implementation.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// The outcome of asking a gate for permission to send.
///
/// A reservation commits its slot at the time it is made. Callers must still
/// wait out [`delay`](Self::delay) before acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    ok: bool,
    delay: Duration,
}

impl Reservation {
    /// A granted reservation that becomes usable after `delay`.
    pub fn granted(delay: Duration) -> Self {
        Self { ok: true, delay }
    }

    /// A reservation that can never be satisfied.
    pub fn refused() -> Self {
        Self {
            ok: false,
            delay: Duration::ZERO,
        }
    }

    /// Whether the reservation was granted.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// How long to wait before using the reservation.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Mutable part of a bucket.
#[derive(Debug)]
struct BucketState {
    /// Tokens currently available. Negative once future slots are reserved.
    tokens: f64,
    /// When `tokens` was last brought up to date
    last_update: Instant,
}

/// A token bucket with continuous refill.
///
/// `capacity` tokens refill evenly over `refill_interval`, so one token
/// becomes available every `refill_interval / capacity`.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_interval: Duration,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity,
            refill_interval,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_update: Instant::now(),
            }),
        }
    }

    /// Maximum number of tokens the bucket holds.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Time for an empty bucket to refill completely.
    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Tokens that could be reserved right now without waiting.
    pub fn available_tokens(&self) -> u32 {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());
        state.tokens.max(0.0).floor() as u32
    }

    /// Reserve a single token.
    pub fn reserve(&self) -> Reservation {
        self.reserve_n(1)
    }

    /// Reserve `n` tokens.
    ///
    /// Requests that can never fit in the bucket are refused without touching
    /// its state.
    pub fn reserve_n(&self, n: u32) -> Reservation {
        if self.capacity == 0 || n > self.capacity {
            return Reservation::refused();
        }

        let now = Instant::now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);

        state.tokens -= n as f64;
        if state.tokens >= 0.0 {
            return Reservation::granted(Duration::ZERO);
        }

        match self.tokens_per_second() {
            Some(rate) => Reservation::granted(
                Duration::try_from_secs_f64(-state.tokens / rate).unwrap_or(Duration::MAX),
            ),
            // Unlimited refill
            None => {
                state.tokens = 0.0;
                Reservation::granted(Duration::ZERO)
            }
        }
    }

    /// Refill rate, or `None` when the bucket refills instantly.
    fn tokens_per_second(&self) -> Option<f64> {
        if self.refill_interval.is_zero() {
            None
        } else {
            Some(self.capacity as f64 / self.refill_interval.as_secs_f64())
        }
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_update);
        state.last_update = now;

        let capacity = self.capacity as f64;
        state.tokens = match self.tokens_per_second() {
            Some(rate) => (state.tokens + rate * elapsed.as_secs_f64()).min(capacity),
            None => capacity,
        };
    }
}
