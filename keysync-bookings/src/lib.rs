//! File-backed booking source.
//!
//! Each apartment points at one file holding a list of reservations:
//!
//! ```yaml
//! - arrival: 2025-09-06
//!   departure: 2025-09-09
//! - arrival: "09.09.2025"     # day-first is accepted too
//!   departure: "12.09.2025"
//!   guest: "ignored extra field"
//! ```
//!
//! The format is picked from the extension (`.yaml`, `.yml`, `.json`).
//! Records with neither date are skipped as blank rows; any other defect fails
//! the whole apartment, because a partial calendar could deactivate a guest
//! who is actually staying.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use keysync_core::{ApartmentConfig, ApartmentId, BookingError, BookingSource, Stay};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Supported booking file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingFormat {
    Yaml,
    Json,
}

impl BookingFormat {
    /// Infer the format from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(BookingFormat::Yaml),
            "json" => Some(BookingFormat::Json),
            _ => None,
        }
    }
}

/// Reads `ApartmentConfig::bookings` from disk on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileBookingSource;

impl FileBookingSource {
    pub fn new() -> Self {
        Self
    }
}

impl BookingSource for FileBookingSource {
    fn get_stays(&self, apartment: &ApartmentConfig) -> Result<Vec<Stay>, BookingError> {
        read_stays(&apartment.id, &apartment.bookings)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read and validate the booking file at `path` for `apartment`.
pub fn read_stays(apartment: &ApartmentId, path: &Path) -> Result<Vec<Stay>, BookingError> {
    let format = BookingFormat::from_path(path).ok_or_else(|| BookingError::Data {
        apartment: apartment.clone(),
        reason: format!(
            "unsupported booking file '{}' (expected .yaml, .yml or .json)",
            path.display()
        ),
    })?;
    let contents = std::fs::read_to_string(path).map_err(|source| BookingError::Io {
        apartment: apartment.clone(),
        path: path.to_path_buf(),
        source,
    })?;
    let stays = parse_stays(apartment, &contents, format)?;
    tracing::debug!(apartment = %apartment, path = %path.display(), count = stays.len(), "bookings loaded");
    Ok(stays)
}

/// Parse booking records from text.
pub fn parse_stays(
    apartment: &ApartmentId,
    contents: &str,
    format: BookingFormat,
) -> Result<Vec<Stay>, BookingError> {
    if contents.trim().is_empty() {
        return Ok(vec![]);
    }

    let data_err = |reason: String| BookingError::Data {
        apartment: apartment.clone(),
        reason,
    };

    let records: Vec<RawStay> = match format {
        BookingFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| data_err(e.to_string()))?,
        BookingFormat::Json => serde_json::from_str(contents).map_err(|e| data_err(e.to_string()))?,
    };

    let mut stays = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let n = index + 1;
        let arrival = record.arrival.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let departure = record.departure.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let (arrival, departure) = match (arrival, departure) {
            (None, None) => continue,
            (Some(_), None) => return Err(data_err(format!("record {n}: missing departure"))),
            (None, Some(_)) => return Err(data_err(format!("record {n}: missing arrival"))),
            (Some(a), Some(d)) => (a, d),
        };

        let arrival_date = parse_date(arrival)
            .ok_or_else(|| data_err(format!("record {n}: unreadable arrival '{arrival}'")))?;
        let departure_date = parse_date(departure)
            .ok_or_else(|| data_err(format!("record {n}: unreadable departure '{departure}'")))?;

        let stay = Stay::new(apartment.clone(), arrival_date, departure_date).ok_or_else(|| {
            data_err(format!(
                "record {n}: departure {departure_date} is before arrival {arrival_date}"
            ))
        })?;
        stays.push(stay);
    }
    Ok(stays)
}

/// Parse a calendar date. ISO (`2025-09-06`) and day-first (`06.09.2025`,
/// `06/09/2025`, `06-09-2025`) forms are accepted; a trailing time of day, as
/// produced by spreadsheet exports, is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y"];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M"];

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

// ---------------------------------------------------------------------------
// On-disk shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawStay {
    #[serde(default)]
    arrival: Option<String>,
    #[serde(default)]
    departure: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
