//! One apartment's unit of work: bookings → plan → read lock → reconcile.

use chrono::NaiveDateTime;

use keysync_core::{
    ApartmentConfig, BookingError, BookingSource, DesiredWindow, LockGateway, ReconciliationResult,
};

use crate::planner::partition;
use crate::reconcile::{reconcile, ReconcileOptions};

/// Desired window for `apartment` at `now`, from its bookings alone.
///
/// Duplicate stays are logged and ignored. No lock is touched.
pub fn desired_window(
    apartment: &ApartmentConfig,
    bookings: &dyn BookingSource,
    now: NaiveDateTime,
) -> Result<DesiredWindow, BookingError> {
    let stays = bookings.get_stays(apartment)?;
    let today = now.date();
    let parts = partition(&stays, today);
    for stay in &parts.ignored {
        tracing::warn!(
            apartment = %apartment.id,
            arrival = %stay.arrival_date,
            departure = %stay.departure_date,
            "overlapping stay ignored"
        );
    }
    Ok(parts.window(
        apartment.id.clone(),
        today,
        now,
        apartment.checkin_time,
        apartment.checkout_time,
    ))
}

/// Run the full reconciliation for one apartment. Every failure ends up in
/// the returned result; nothing propagates.
pub fn run_apartment(
    apartment: &ApartmentConfig,
    bookings: &dyn BookingSource,
    gateway: &dyn LockGateway,
    now: NaiveDateTime,
    opts: &ReconcileOptions,
) -> ReconciliationResult {
    let desired = match desired_window(apartment, bookings, now) {
        Ok(desired) => desired,
        Err(err) => {
            tracing::warn!(apartment = %apartment.id, error = %err, "bookings unusable");
            return ReconciliationResult::failed(apartment.id.clone(), err.kind(), err.to_string());
        }
    };

    let current = match gateway.get_state(&apartment.slot()) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(apartment = %apartment.id, error = %err, "lock read failed");
            return ReconciliationResult {
                window: desired.window,
                ..ReconciliationResult::failed(apartment.id.clone(), err.kind(), err.to_string())
            };
        }
    };

    reconcile(&desired, &current, apartment, gateway, opts)
}
