//! In-memory port implementations.
//!
//! Used by tests across the workspace and handy for dry experiments: state
//! lives in a `Mutex`, every call is counted, and failures can be injected per
//! lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{BookingError, GatewayError};
use crate::ports::{BookingSource, LockGateway};
use crate::types::{
    ApartmentConfig, ApartmentId, CodeSlot, FailureKind, LockCodeState, LockId, Stay,
    ValidityWindow,
};

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

/// Booking source backed by a map of apartment id → stays.
#[derive(Debug, Default)]
pub struct MemoryBookingSource {
    stays: Mutex<HashMap<ApartmentId, Vec<Stay>>>,
    broken: Mutex<HashMap<ApartmentId, String>>,
}

impl MemoryBookingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, apartment: ApartmentId, stays: Vec<Stay>) {
        lock(&self.stays).insert(apartment, stays);
    }

    /// Make `get_stays` fail with a data error for `apartment`.
    pub fn break_apartment(&self, apartment: ApartmentId, reason: impl Into<String>) {
        lock(&self.broken).insert(apartment, reason.into());
    }
}

impl BookingSource for MemoryBookingSource {
    fn get_stays(&self, apartment: &ApartmentConfig) -> Result<Vec<Stay>, BookingError> {
        if let Some(reason) = lock(&self.broken).get(&apartment.id) {
            return Err(BookingError::Data {
                apartment: apartment.id.clone(),
                reason: reason.clone(),
            });
        }
        Ok(lock(&self.stays)
            .get(&apartment.id)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

/// Which gateway operation an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    Read,
    Write,
    Sync,
}

/// Lock gateway that keeps one [`LockCodeState`] per lock id.
#[derive(Debug, Default)]
pub struct MemoryLockGateway {
    states: Mutex<HashMap<LockId, LockCodeState>>,
    failures: Mutex<HashMap<(LockId, GatewayOp), (FailureKind, String)>>,
    delays: Mutex<HashMap<LockId, Duration>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    syncs: AtomicUsize,
}

impl MemoryLockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, lock_id: LockId, state: LockCodeState) {
        lock(&self.states).insert(lock_id, state);
    }

    /// Current state; unknown locks read as inactive.
    pub fn state(&self, lock_id: &LockId) -> LockCodeState {
        lock(&self.states).get(lock_id).copied().unwrap_or_default()
    }

    /// Make every `op` on `lock_id` fail. `kind` picks the error variant;
    /// `Data` and `Internal` have no gateway counterpart and map to `Conflict`.
    pub fn fail(&self, lock_id: LockId, op: GatewayOp, kind: FailureKind, message: impl Into<String>) {
        lock(&self.failures).insert((lock_id, op), (kind, message.into()));
    }

    /// Block every call on `lock_id` for `delay` before answering.
    pub fn delay(&self, lock_id: LockId, delay: Duration) {
        lock(&self.delays).insert(lock_id, delay);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn syncs(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }

    fn before_call(&self, lock_id: &LockId, op: GatewayOp) -> Result<(), GatewayError> {
        let delay = lock(&self.delays).get(lock_id).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        match lock(&self.failures).get(&(lock_id.clone(), op)) {
            Some((kind, message)) => Err(match kind {
                FailureKind::Unreachable => GatewayError::Unreachable(message.clone()),
                FailureKind::Auth => GatewayError::Auth(message.clone()),
                _ => GatewayError::Conflict(message.clone()),
            }),
            None => Ok(()),
        }
    }
}

impl LockGateway for MemoryLockGateway {
    fn get_state(&self, slot: &CodeSlot) -> Result<LockCodeState, GatewayError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.before_call(&slot.lock_id, GatewayOp::Read)?;
        Ok(self.state(&slot.lock_id))
    }

    fn set_window(
        &self,
        slot: &CodeSlot,
        window: Option<&ValidityWindow>,
    ) -> Result<(), GatewayError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.before_call(&slot.lock_id, GatewayOp::Write)?;
        self.set_state(slot.lock_id.clone(), LockCodeState::from_window(window));
        Ok(())
    }

    fn request_sync(&self, lock_id: &LockId) -> Result<(), GatewayError> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        self.before_call(lock_id, GatewayOp::Sync)
    }
}

/// Poison-tolerant lock: a panicking test thread must not wedge the others.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    fn apartment(id: &str) -> ApartmentConfig {
        ApartmentConfig {
            id: ApartmentId::from(id),
            name: format!("Apartment {id}"),
            lock_id: LockId::from(format!("lock-{id}")),
            pin: None,
            code_name: "Guests".to_string(),
            checkin_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            checkout_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            bookings: PathBuf::from("/dev/null"),
        }
    }

    #[test]
    fn unknown_apartment_has_no_stays() {
        let source = MemoryBookingSource::new();
        assert!(source.get_stays(&apartment("1")).unwrap().is_empty());
    }

    #[test]
    fn broken_apartment_returns_data_error() {
        let source = MemoryBookingSource::new();
        source.break_apartment(ApartmentId::from("1"), "missing arrival");
        let err = source.get_stays(&apartment("1")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Data);
    }

    #[test]
    fn write_then_read_round_trips_and_counts() {
        let gateway = MemoryLockGateway::new();
        let slot = apartment("1").slot();
        let d = NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
        let window = ValidityWindow {
            from: d.and_hms_opt(15, 0, 0).unwrap(),
            until: d.and_hms_opt(18, 0, 0).unwrap(),
        };

        gateway.set_window(&slot, Some(&window)).unwrap();
        let state = gateway.get_state(&slot).unwrap();
        assert!(state.active);
        assert_eq!(state.valid_from, Some(window.from));
        assert_eq!(gateway.reads(), 1);
        assert_eq!(gateway.writes(), 1);
    }

    #[test]
    fn injected_failure_maps_to_gateway_error() {
        let gateway = MemoryLockGateway::new();
        let slot = apartment("2").slot();
        gateway.fail(slot.lock_id.clone(), GatewayOp::Write, FailureKind::Unreachable, "down");

        assert!(gateway.get_state(&slot).is_ok());
        let err = gateway.set_window(&slot, None).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Unreachable);
    }
}
