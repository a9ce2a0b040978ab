//! Seams to the outside world: where bookings come from and how locks are
//! read and written.
//!
//! Both traits are object-safe and `Send + Sync` so a run can share one
//! instance across its worker threads as `Arc<dyn …>`. Implementations are
//! blocking; the runner moves them onto blocking threads.

use crate::error::{BookingError, GatewayError};
use crate::types::{ApartmentConfig, CodeSlot, LockCodeState, LockId, Stay, ValidityWindow};

/// Supplies the reservations of one apartment.
pub trait BookingSource: Send + Sync {
    /// All known stays of `apartment`. Order is not significant.
    fn get_stays(&self, apartment: &ApartmentConfig) -> Result<Vec<Stay>, BookingError>;
}

/// Reads and writes the validity window of a lock's shared code.
pub trait LockGateway: Send + Sync {
    /// Fresh remote state of the code. A code that does not exist yet reads
    /// as inactive.
    fn get_state(&self, slot: &CodeSlot) -> Result<LockCodeState, GatewayError>;

    /// Replace the code's validity with `window`; `None` deactivates it.
    fn set_window(&self, slot: &CodeSlot, window: Option<&ValidityWindow>)
        -> Result<(), GatewayError>;

    /// Ask the backend to push pending changes to the device.
    fn request_sync(&self, _lock_id: &LockId) -> Result<(), GatewayError> {
        Ok(())
    }
}
