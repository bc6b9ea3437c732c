//! Timestamp utilities and the session clock
//!
//! [`SessionClock`] is the monotonic clock every timing decision in the
//! jukebox is made against. It is built on `tokio::time::Instant`, so tests
//! running under tokio's paused clock observe exact, virtual durations.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Monotonic clock anchored at session start
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    /// Start a new session clock at the current instant
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Instant the session started
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Monotonic real time elapsed since session start
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Elapsed session time in whole milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Session-relative offset of an instant (zero if it predates the session)
    pub fn offset_of(&self, instant: Instant) -> Duration {
        instant.saturating_duration_since(self.origin)
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}
