//! `run_apartment` against the in-memory ports.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use keysync_core::memory::{GatewayOp, MemoryBookingSource, MemoryLockGateway};
use keysync_core::{
    Action, ApartmentConfig, ApartmentId, FailureKind, LockCodeState, LockId, Stay, ValidityWindow,
};
use keysync_sync::{desired_window, run_apartment, ReconcileOptions};

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").unwrap()
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn apartment(id: &str) -> ApartmentConfig {
    ApartmentConfig {
        id: ApartmentId::from(id),
        name: format!("Apartment {id}"),
        lock_id: LockId::from(format!("lock-{id}")),
        pin: None,
        code_name: "Guests".to_string(),
        checkin_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        checkout_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        bookings: PathBuf::from(format!("{id}.yaml")),
    }
}

fn stay(id: &str, arrival: &str, departure: &str) -> Stay {
    Stay::new(ApartmentId::from(id), d(arrival), d(departure)).unwrap()
}

#[test]
fn arriving_guest_activates_lock() {
    let bookings = MemoryBookingSource::new();
    bookings.insert(ApartmentId::from("12"), vec![stay("12", "2025-09-06", "2025-09-09")]);
    let gateway = MemoryLockGateway::new();

    let result = run_apartment(
        &apartment("12"),
        &bookings,
        &gateway,
        at("2025-09-06T05:00"),
        &ReconcileOptions::default(),
    );

    assert_eq!(result.action, Action::Activated);
    let state = gateway.state(&LockId::from("lock-12"));
    assert!(state.active);
    assert_eq!(state.valid_from, Some(at("2025-09-06T15:00")));
    assert_eq!(state.valid_until, Some(at("2025-09-09T10:00")));
    assert_eq!((gateway.reads(), gateway.writes()), (1, 1));
}

#[test]
fn repeated_run_is_idempotent() {
    let bookings = MemoryBookingSource::new();
    bookings.insert(ApartmentId::from("12"), vec![stay("12", "2025-09-06", "2025-09-09")]);
    let gateway = MemoryLockGateway::new();
    let opts = ReconcileOptions::default();
    let now = at("2025-09-07T05:00");

    run_apartment(&apartment("12"), &bookings, &gateway, now, &opts);
    let second = run_apartment(&apartment("12"), &bookings, &gateway, now, &opts);

    assert_eq!(second.action, Action::Noop);
    assert_eq!(gateway.writes(), 1);
}

#[test]
fn no_stays_deactivates_an_active_lock() {
    let bookings = MemoryBookingSource::new();
    let gateway = MemoryLockGateway::new();
    gateway.set_state(
        LockId::from("lock-12"),
        LockCodeState::from_window(Some(&ValidityWindow {
            from: at("2025-09-01T15:00"),
            until: at("2025-09-05T10:00"),
        })),
    );

    let result = run_apartment(
        &apartment("12"),
        &bookings,
        &gateway,
        at("2025-09-07T05:00"),
        &ReconcileOptions::default(),
    );
    assert_eq!(result.action, Action::Deactivated);
    assert_eq!(result.window, None);
}

#[test]
fn booking_error_fails_without_touching_lock() {
    let bookings = MemoryBookingSource::new();
    bookings.break_apartment(ApartmentId::from("12"), "record 3: missing departure");
    let gateway = MemoryLockGateway::new();

    let result = run_apartment(
        &apartment("12"),
        &bookings,
        &gateway,
        at("2025-09-07T05:00"),
        &ReconcileOptions::default(),
    );
    assert_eq!(result.action, Action::Failed);
    assert_eq!(result.error.as_ref().map(|e| e.kind), Some(FailureKind::Data));
    assert_eq!(gateway.reads(), 0);
}

#[test]
fn read_failure_skips_the_write() {
    let bookings = MemoryBookingSource::new();
    bookings.insert(ApartmentId::from("12"), vec![stay("12", "2025-09-06", "2025-09-09")]);
    let gateway = MemoryLockGateway::new();
    gateway.fail(LockId::from("lock-12"), GatewayOp::Read, FailureKind::Auth, "401");

    let result = run_apartment(
        &apartment("12"),
        &bookings,
        &gateway,
        at("2025-09-07T05:00"),
        &ReconcileOptions::default(),
    );
    assert_eq!(result.action, Action::Failed);
    assert_eq!(result.error.as_ref().map(|e| e.kind), Some(FailureKind::Auth));
    assert!(result.window.is_some(), "desired window is still reported");
    assert_eq!(gateway.writes(), 0);
}

#[test]
fn desired_window_uses_apartment_times() {
    let bookings = MemoryBookingSource::new();
    bookings.insert(ApartmentId::from("14"), vec![stay("14", "2025-09-06", "2025-09-09")]);
    let mut apt = apartment("14");
    apt.checkin_time = NaiveTime::from_hms_opt(16, 30, 0).unwrap();

    let desired = desired_window(&apt, &bookings, at("2025-09-07T05:00")).unwrap();
    assert_eq!(desired.valid_from(), Some(at("2025-09-06T16:30")));
}
