//! Desired window vs. remote lock state: decide, then write at most once.

use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use keysync_core::{
    Action, ApartmentConfig, DesiredWindow, FailureKind, LockCodeState, LockGateway,
    ReconciliationResult,
};

/// Knobs for [`reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Largest difference between a desired and a remote bound still treated
    /// as equal. Locks round times.
    pub tolerance: Duration,
    /// Classify but never write.
    pub dry_run: bool,
    /// Ask the gateway to push a successful write to the device.
    pub force_sync_after_change: bool,
    /// No write is started after this instant.
    pub deadline: Option<Instant>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            tolerance: Duration::from_secs(60),
            dry_run: false,
            force_sync_after_change: false,
            deadline: None,
        }
    }
}

fn close(desired: NaiveDateTime, remote: Option<NaiveDateTime>, tolerance: Duration) -> bool {
    match remote {
        Some(remote) => {
            let diff = (desired - remote).num_milliseconds().unsigned_abs();
            u128::from(diff) <= tolerance.as_millis()
        }
        None => false,
    }
}

/// `active` must match exactly; bounds only matter when both sides are active.
pub fn states_match(desired: &DesiredWindow, current: &LockCodeState, tolerance: Duration) -> bool {
    match desired.window {
        None => !current.active,
        Some(w) => {
            current.active
                && close(w.from, current.valid_from, tolerance)
                && close(w.until, current.valid_until, tolerance)
        }
    }
}

fn classify(desired: &DesiredWindow, current: &LockCodeState) -> Action {
    match (current.active, desired.is_active()) {
        (false, true) => Action::Activated,
        (true, false) => Action::Deactivated,
        (true, true) => Action::Updated,
        (false, false) => Action::Noop,
    }
}

/// Bring the lock of `apartment` to `desired`, given its freshly read state.
///
/// Never fails: gateway errors become a `FAILED` result.
pub fn reconcile(
    desired: &DesiredWindow,
    current: &LockCodeState,
    apartment: &ApartmentConfig,
    gateway: &dyn LockGateway,
    opts: &ReconcileOptions,
) -> ReconciliationResult {
    let outcome = |action: Action| ReconciliationResult {
        apartment_id: apartment.id.clone(),
        action,
        error: None,
        window: desired.window,
        dry_run: opts.dry_run,
    };

    if states_match(desired, current, opts.tolerance) {
        tracing::debug!(apartment = %apartment.id, "lock already up to date");
        return outcome(Action::Noop);
    }

    let action = classify(desired, current);
    if opts.dry_run {
        tracing::info!(apartment = %apartment.id, action = %action, "dry run: write skipped");
        return outcome(action);
    }

    if opts.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
        tracing::warn!(apartment = %apartment.id, action = %action, "time budget spent, write skipped");
        return ReconciliationResult {
            window: desired.window,
            ..ReconciliationResult::failed(
                apartment.id.clone(),
                FailureKind::Unreachable,
                "time budget spent before the lock could be written",
            )
        };
    }

    if let Err(err) = gateway.set_window(&apartment.slot(), desired.window.as_ref()) {
        tracing::warn!(apartment = %apartment.id, action = %action, error = %err, "lock write failed");
        return ReconciliationResult {
            window: desired.window,
            ..ReconciliationResult::failed(apartment.id.clone(), err.kind(), err.to_string())
        };
    }
    tracing::info!(apartment = %apartment.id, action = %action, "lock updated");

    if opts.force_sync_after_change {
        if let Err(err) = gateway.request_sync(&apartment.lock_id) {
            tracing::warn!(apartment = %apartment.id, error = %err, "device sync request failed");
        }
    }
    outcome(action)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
