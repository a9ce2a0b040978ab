//! `FileBookingSource` against real files.
//!
//! Each test gets an isolated `TempDir`.

use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use keysync_bookings::FileBookingSource;
use keysync_core::{ApartmentConfig, ApartmentId, BookingError, BookingSource, LockId};
use tempfile::TempDir;

fn apartment(bookings: PathBuf) -> ApartmentConfig {
    ApartmentConfig {
        id: ApartmentId::from("12"),
        name: "Apartment 12".to_string(),
        lock_id: LockId::from("17890"),
        pin: None,
        code_name: "Guests".to_string(),
        checkin_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        checkout_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        bookings,
    }
}

#[test]
fn reads_yaml_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("12.yaml");
    fs::write(&path, "- arrival: 2025-09-06\n  departure: 2025-09-09\n").expect("write");

    let stays = FileBookingSource::new()
        .get_stays(&apartment(path))
        .expect("stays");
    assert_eq!(stays.len(), 1);
    assert_eq!(
        stays[0].arrival_date,
        NaiveDate::from_ymd_opt(2025, 9, 6).unwrap()
    );
}

#[test]
fn reads_json_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("12.json");
    fs::write(
        &path,
        r#"[{"arrival": "06.09.2025", "departure": "09.09.2025", "guest": "x"}]"#,
    )
    .expect("write");

    let stays = FileBookingSource::new()
        .get_stays(&apartment(path))
        .expect("stays");
    assert_eq!(
        stays[0].departure_date,
        NaiveDate::from_ymd_opt(2025, 9, 9).unwrap()
    );
}

#[test]
fn missing_file_is_io_error_with_path() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("absent.yaml");

    let err = FileBookingSource::new()
        .get_stays(&apartment(path))
        .unwrap_err();
    assert!(matches!(err, BookingError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn spreadsheet_file_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("12.xlsx");
    fs::write(&path, b"PK\x03\x04").expect("write");

    let err = FileBookingSource::new()
        .get_stays(&apartment(path))
        .unwrap_err();
    assert!(matches!(err, BookingError::Data { .. }), "got: {err}");
    assert!(err.to_string().contains("unsupported booking file"));
}
