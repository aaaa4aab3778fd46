//! Process-wide cooldown gate.
//!
//! When the server signals a global rate limit every outgoing request waits
//! until the cooldown has passed, regardless of its bucket.

use parking_lot::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{trace, warn};

use super::bucket::Reservation;

/// A single cooldown window shared by all requests.
///
/// The gate stores the instant the cooldown ends and only ever moves it
/// later, so an overlapping shorter signal cannot cut a longer one short.
#[derive(Debug, Default)]
pub struct GlobalGate {
    armed_until: RwLock<Option<Instant>>,
}

impl GlobalGate {
    /// Create an inactive gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve passage through the gate.
    ///
    /// Always granted; the delay is the remaining cooldown.
    pub fn reserve(&self) -> Reservation {
        Reservation::granted(self.reset_after())
    }

    /// Remaining cooldown, zero when no global limit is active.
    pub fn reset_after(&self) -> Duration {
        match *self.armed_until.read() {
            Some(until) => until.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Whether a global cooldown is currently in force.
    pub fn is_active(&self) -> bool {
        !self.reset_after().is_zero()
    }

    /// Record a global rate limit lasting `reset_after_secs` seconds.
    ///
    /// Zero, negative and non-finite values leave the gate unchanged.
    pub fn signal(&self, reset_after_secs: f64) {
        if reset_after_secs <= 0.0 {
            trace!(reset_after_secs, "Ignoring non-positive global reset");
            return;
        }
        let Ok(reset_after) = Duration::try_from_secs_f64(reset_after_secs) else {
            trace!(reset_after_secs, "Ignoring unrepresentable global reset");
            return;
        };
        let Some(until) = Instant::now().checked_add(reset_after) else {
            trace!(reset_after_secs, "Ignoring unrepresentable global reset");
            return;
        };

        let mut armed_until = self.armed_until.write();
        match *armed_until {
            Some(current) if current >= until => {}
            _ => {
                *armed_until = Some(until);
                warn!(reset_after = ?reset_after, "Globally rate limited");
            }
        }
    }
}
