//! Injectable time source.
//!
//! Every timestamp in the knowledge base is milliseconds since the Unix epoch.
//! The tracker, store and flush scheduler read time through [`Clock`] so tests
//! can drive ageing and flush intervals deterministically with [`FakeClock`].

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::result::{GenomeError, GenomeResult};

/// Milliseconds in one day
pub const DAY_MS: u64 = 86_400_000;

/// Source of wall-clock time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync + Debug {
    /// Current time in milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by [`SystemTime`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        system_now_ms()
    }
}

/// Read the system clock, returning 0 if it is set before the epoch
#[must_use]
pub fn system_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Manually advanced clock for deterministic tests
#[derive(Debug, Default)]
pub struct FakeClock {
    current_ms: AtomicU64,
}

impl FakeClock {
    /// Create a fake clock fixed at `time_ms`
    #[must_use]
    pub const fn new(time_ms: u64) -> Self {
        Self {
            current_ms: AtomicU64::new(time_ms),
        }
    }

    /// Create a shared fake clock fixed at `time_ms`
    #[must_use]
    pub fn shared(time_ms: u64) -> Arc<Self> {
        Arc::new(Self::new(time_ms))
    }

    /// Create a fake clock from an RFC 3339 timestamp such as `2024-03-01T12:00:00Z`
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::Config`] if the timestamp cannot be parsed
    pub fn from_rfc3339(iso: &str) -> GenomeResult<Self> {
        let parsed = chrono::DateTime::parse_from_rfc3339(iso.trim())
            .map_err(|e| GenomeError::config(format!("invalid timestamp {iso:?}: {e}")))?;
        let ms = u64::try_from(parsed.timestamp_millis())
            .map_err(|_| GenomeError::config(format!("timestamp before epoch: {iso}")))?;
        Ok(Self::new(ms))
    }

    /// Set the clock to a fixed time
    pub fn set(&self, time_ms: u64) {
        self.current_ms.store(time_ms, Ordering::SeqCst);
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Duration) {
        self.current_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Move the clock forward by whole days
    pub fn advance_days(&self, days: u64) {
        self.current_ms.fetch_add(days * DAY_MS, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }
}

/// Fractional days elapsed between two timestamps, zero if `later` is earlier
#[must_use]
pub fn days_between(earlier_ms: u64, later_ms: u64) -> f64 {
    later_ms.saturating_sub(earlier_ms) as f64 / DAY_MS as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // FakeClock
    // =========================================================================

    #[test]
    fn test_fake_clock_fixed() {
        let clock = FakeClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        assert_eq!(clock.now_ms(), 1_000);
    }

    #[test]
    fn test_fake_clock_advance() {
        let clock = FakeClock::new(0);
        clock.advance(Duration::from_millis(250));
        clock.advance_days(2);
        assert_eq!(clock.now_ms(), 250 + 2 * DAY_MS);
    }

    #[test]
    fn test_fake_clock_set() {
        let clock = FakeClock::new(5);
        clock.set(42);
        assert_eq!(clock.now_ms(), 42);
    }

    #[test]
    fn test_fake_clock_from_rfc3339() {
        let clock = FakeClock::from_rfc3339("1970-01-02T00:00:00Z").unwrap();
        assert_eq!(clock.now_ms(), DAY_MS);
    }

    #[test]
    fn test_fake_clock_from_rfc3339_invalid() {
        assert!(FakeClock::from_rfc3339("yesterday").is_err());
    }

    // =========================================================================
    // SystemClock / helpers
    // =========================================================================

    #[test]
    fn test_system_clock_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_days_between() {
        assert!((days_between(0, DAY_MS * 3) - 3.0).abs() < f64::EPSILON);
        assert!((days_between(0, DAY_MS / 2) - 0.5).abs() < f64::EPSILON);
        assert_eq!(days_between(10, 5), 0.0);
    }

    #[test]
    fn test_shared_clock_as_trait_object() {
        let fake = FakeClock::shared(7);
        let clock: SharedClock = fake.clone();
        fake.advance(Duration::from_millis(3));
        assert_eq!(clock.now_ms(), 10);
    }
}
