//! Telemetry acquisition
//!
//! [`TelemetryReader`] owns the transport and the cached snapshot. A refresh
//! pass reads the five register pairs in [`ACQUISITION_ORDER`] under one
//! lock, and only commits the new snapshot once all ten single-register
//! reads have succeeded.

use crate::clock::{Clock, MonotonicClock};
use crate::registers::{ACQUISITION_ORDER, RegisterPair, compose};
use crate::snapshot::TelemetrySnapshot;
use fuelgauge_config::TelemetryConfig;
use fuelgauge_hal::{RegisterTransport, TransportError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Default snapshot lifetime
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(1000);

/// What a successful [`TelemetryReader::refresh`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot was young enough; the bus was not touched
    Cached,
    /// A full pass completed and the snapshot was replaced
    Refreshed,
}

struct ReaderState<T> {
    transport: T,
    snapshot: TelemetrySnapshot,
}

/// Cached, serialized access to the gauge
pub struct TelemetryReader<T> {
    state: Mutex<ReaderState<T>>,
    cache_ttl_ms: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl<T: RegisterTransport> TelemetryReader<T> {
    /// Create a reader with the default cache lifetime
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, DEFAULT_CACHE_TTL, Arc::new(MonotonicClock))
    }

    /// Create with custom configuration
    pub fn with_config(transport: T, config: &TelemetryConfig) -> Self {
        Self::with_clock(transport, config.cache_ttl(), Arc::new(MonotonicClock))
    }

    pub fn with_clock(transport: T, cache_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(ReaderState {
                transport,
                snapshot: TelemetrySnapshot::default(),
            }),
            cache_ttl_ms: AtomicU64::new(duration_ms(cache_ttl)),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReaderState<T>> {
        // A panic mid-pass never commits, so the snapshot is still whole
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms.load(Ordering::Relaxed))
    }

    /// Change the cache lifetime; takes effect on the next refresh
    pub fn set_cache_ttl(&self, ttl: Duration) {
        self.cache_ttl_ms.store(duration_ms(ttl), Ordering::Relaxed);
        tracing::debug!("Telemetry cache TTL set to {:?}", ttl);
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.lock().snapshot
    }

    /// Bring the snapshot up to date.
    ///
    /// Without `force`, a snapshot younger than the cache TTL is kept and no
    /// bus traffic happens. On failure the previous snapshot stays in place.
    pub fn refresh(&self, force: bool) -> Result<RefreshOutcome, TransportError> {
        let mut state = self.lock();
        let now = self.clock.now();

        if !force {
            if let Some(last) = state.snapshot.last_refresh {
                let age = now.saturating_duration_since(last);
                if age < self.cache_ttl() {
                    tracing::trace!("Telemetry cache hit (age {:?})", age);
                    return Ok(RefreshOutcome::Cached);
                }
            }
        }

        let mut words = [0u16; 5];
        for (word, pair) in words.iter_mut().zip(ACQUISITION_ORDER) {
            *word = read_word(&mut state.transport, pair).inspect_err(|e| {
                tracing::warn!("Reading {} failed, keeping previous telemetry: {}", pair.name, e);
            })?;
        }

        state.snapshot = TelemetrySnapshot::from_words(words, now);
        tracing::debug!(
            full_mah = words[0],
            status = words[1],
            rate_ma = words[2],
            remaining_mah = words[3],
            voltage_mv = words[4],
            "Telemetry refreshed"
        );
        Ok(RefreshOutcome::Refreshed)
    }

    /// Tear down and give the transport back
    pub fn into_transport(self) -> T {
        self.state
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .transport
    }
}

fn read_word<T: RegisterTransport>(transport: &mut T, pair: RegisterPair) -> Result<u16, TransportError> {
    let high = transport.read_register(pair.high())?;
    let low = transport.read_register(pair.low())?;
    Ok(compose(high, low))
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::registers::*;
    use crate::snapshot::StateFlags;
    use fuelgauge_hal::mock::MockTransport;

    fn seeded_gauge() -> MockTransport {
        let mock = MockTransport::new();
        mock.set_word(FULL_CHARGE_CAPACITY.base, 4200);
        mock.set_word(STATUS.base, 0x0002);
        mock.set_word(PRESENT_RATE.base, 500);
        mock.set_word(REMAINING_CAPACITY.base, 4000);
        mock.set_word(PRESENT_VOLTAGE.base, 3900);
        mock
    }

    fn reader_with_clock(mock: &MockTransport) -> (TelemetryReader<MockTransport>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let reader = TelemetryReader::with_clock(mock.clone(), DEFAULT_CACHE_TTL, clock.clone());
        (reader, clock)
    }

    #[test]
    fn test_new_reader_has_empty_snapshot() {
        let reader = TelemetryReader::new(MockTransport::new());
        assert!(!reader.snapshot().is_populated());
        assert_eq!(reader.cache_ttl(), DEFAULT_CACHE_TTL);
    }

    #[test]
    fn test_refresh_reads_all_registers_in_order() {
        let mock = seeded_gauge();
        let (reader, clock) = reader_with_clock(&mock);

        assert_eq!(reader.refresh(false).unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(
            mock.log(),
            vec![0x144, 0x145, 0x1A0, 0x1A1, 0x1A2, 0x1A3, 0x1A4, 0x1A5, 0x1A6, 0x1A7]
        );

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.full_charge_capacity_mah, 4200);
        assert_eq!(snapshot.state_flags, StateFlags::DISCHARGING);
        assert_eq!(snapshot.rate_now_ma, 500);
        assert_eq!(snapshot.capacity_now_mah, 4000);
        assert_eq!(snapshot.voltage_now_mv, 3900);
        assert_eq!(snapshot.last_refresh, Some(clock.now()));
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let mock = seeded_gauge();
        let (reader, clock) = reader_with_clock(&mock);

        reader.refresh(false).unwrap();
        clock.advance(Duration::from_millis(999));
        assert_eq!(reader.refresh(false).unwrap(), RefreshOutcome::Cached);
        assert_eq!(mock.reads(), TRANSACTIONS_PER_PASS);
    }

    #[test]
    fn test_cache_expires_after_ttl() {
        let mock = seeded_gauge();
        let (reader, clock) = reader_with_clock(&mock);

        reader.refresh(false).unwrap();
        clock.advance(Duration::from_millis(1000));
        assert_eq!(reader.refresh(false).unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(mock.reads(), 2 * TRANSACTIONS_PER_PASS);
    }

    #[test]
    fn test_force_bypasses_cache() {
        let mock = seeded_gauge();
        let (reader, _clock) = reader_with_clock(&mock);

        reader.refresh(false).unwrap();
        assert_eq!(reader.refresh(true).unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(mock.reads(), 2 * TRANSACTIONS_PER_PASS);
    }

    #[test]
    fn test_set_cache_ttl_at_runtime() {
        let mock = seeded_gauge();
        let (reader, clock) = reader_with_clock(&mock);

        reader.refresh(false).unwrap();
        reader.set_cache_ttl(Duration::from_secs(10));
        clock.advance(Duration::from_secs(5));
        assert_eq!(reader.refresh(false).unwrap(), RefreshOutcome::Cached);

        reader.set_cache_ttl(Duration::ZERO);
        assert_eq!(reader.refresh(false).unwrap(), RefreshOutcome::Refreshed);
    }

    #[test]
    fn test_failed_first_pass_leaves_snapshot_empty() {
        let mock = seeded_gauge();
        mock.set_failing(true);
        let (reader, _clock) = reader_with_clock(&mock);

        assert!(reader.refresh(false).is_err());
        assert_eq!(reader.snapshot(), TelemetrySnapshot::default());
        // Aborted on the first transaction
        assert_eq!(mock.reads(), 1);
    }

    #[test]
    fn test_failure_is_retried_on_next_call() {
        let mock = seeded_gauge();
        let (reader, _clock) = reader_with_clock(&mock);

        mock.fail_nth(3);
        assert!(reader.refresh(false).is_err());
        // No stamp was taken, so the cache does not shield the retry
        assert_eq!(reader.refresh(false).unwrap(), RefreshOutcome::Refreshed);
        assert!(reader.snapshot().is_populated());
    }

    #[test]
    fn test_into_transport() {
        let mock = seeded_gauge();
        let reader = TelemetryReader::new(mock.clone());
        reader.refresh(true).unwrap();

        let transport = reader.into_transport();
        assert_eq!(transport.reads(), TRANSACTIONS_PER_PASS);
    }
}
