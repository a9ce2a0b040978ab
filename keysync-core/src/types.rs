//! Domain types shared by every keysync crate.
//!
//! All dates and times are site-local wall-clock values (`Naive*`). Conversion
//! to UTC is the lock gateway's business, never the planner's.

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a configured apartment (the key of the `apartments` map).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApartmentId(pub String);

impl fmt::Display for ApartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ApartmentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ApartmentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Remote identifier of a keypad-equipped lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId(pub String);

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for LockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LockId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Numeric keypad code. Digits only; `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pin(pub String);

impl Pin {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_digit())
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

impl From<&str> for Pin {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Pin {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

/// One reservation: arrival and departure calendar dates, inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub apartment_id: ApartmentId,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
}

impl Stay {
    /// Returns `None` when `departure_date` precedes `arrival_date`.
    pub fn new(
        apartment_id: ApartmentId,
        arrival_date: NaiveDate,
        departure_date: NaiveDate,
    ) -> Option<Self> {
        (arrival_date <= departure_date).then_some(Self {
            apartment_id,
            arrival_date,
            departure_date,
        })
    }
}

// ---------------------------------------------------------------------------
// Apartment configuration
// ---------------------------------------------------------------------------

/// Fully resolved configuration of one apartment.
///
/// Built once by [`crate::config`] with global defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApartmentConfig {
    pub id: ApartmentId,
    /// Display name used in logs and reports.
    pub name: String,
    pub lock_id: LockId,
    /// Only needed when the shared code must be created on the lock.
    pub pin: Option<Pin>,
    /// Name of the shared keypad code on the lock.
    pub code_name: String,
    pub checkin_time: NaiveTime,
    pub checkout_time: NaiveTime,
    /// Booking file for this apartment (absolute after config resolution).
    pub bookings: PathBuf,
}

impl ApartmentConfig {
    /// The lock-side address of this apartment's shared code.
    pub fn slot(&self) -> CodeSlot {
        CodeSlot {
            lock_id: self.lock_id.clone(),
            code_name: self.code_name.clone(),
            pin: self.pin.clone(),
        }
    }
}

/// Lock id + code name + pin: everything a gateway needs to address the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSlot {
    pub lock_id: LockId,
    pub code_name: String,
    pub pin: Option<Pin>,
}

// ---------------------------------------------------------------------------
// Windows and lock state
// ---------------------------------------------------------------------------

/// A closed validity interval in site-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub from: NaiveDateTime,
    pub until: NaiveDateTime,
}

/// What the reconciler wants the lock to look like right now.
///
/// An inactive window carries no times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredWindow {
    pub apartment_id: ApartmentId,
    pub window: Option<ValidityWindow>,
}

impl DesiredWindow {
    pub fn active(apartment_id: ApartmentId, from: NaiveDateTime, until: NaiveDateTime) -> Self {
        Self {
            apartment_id,
            window: Some(ValidityWindow { from, until }),
        }
    }

    pub fn inactive(apartment_id: ApartmentId) -> Self {
        Self {
            apartment_id,
            window: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.window.is_some()
    }

    pub fn valid_from(&self) -> Option<NaiveDateTime> {
        self.window.map(|w| w.from)
    }

    pub fn valid_until(&self) -> Option<NaiveDateTime> {
        self.window.map(|w| w.until)
    }
}

/// Current remote state of the shared code, as read from the lock.
///
/// Remote data may be half-populated (e.g. a start without an end), so the
/// bounds are kept independent of `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockCodeState {
    pub active: bool,
    pub valid_from: Option<NaiveDateTime>,
    pub valid_until: Option<NaiveDateTime>,
}

impl LockCodeState {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn from_window(window: Option<&ValidityWindow>) -> Self {
        match window {
            Some(w) => Self {
                active: true,
                valid_from: Some(w.from),
                valid_until: Some(w.until),
            },
            None => Self::inactive(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation outcome
// ---------------------------------------------------------------------------

/// What a reconciliation did (or, in dry-run mode, would do) to a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Noop,
    Activated,
    Deactivated,
    Updated,
    Failed,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Noop => write!(f, "NOOP"),
            Action::Activated => write!(f, "ACTIVATED"),
            Action::Deactivated => write!(f, "DEACTIVATED"),
            Action::Updated => write!(f, "UPDATED"),
            Action::Failed => write!(f, "FAILED"),
        }
    }
}

/// Category of a per-apartment failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Booking data missing or malformed.
    Data,
    /// Network failure or timeout.
    Unreachable,
    /// Credential rejected.
    Auth,
    /// Remote rejected the write.
    Conflict,
    /// The unit of work itself crashed.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Data => write!(f, "data"),
            FailureKind::Unreachable => write!(f, "unreachable"),
            FailureKind::Auth => write!(f, "auth"),
            FailureKind::Conflict => write!(f, "conflict"),
            FailureKind::Internal => write!(f, "internal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one apartment's unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub apartment_id: ApartmentId,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
    /// Desired window, when one was computed and is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<ValidityWindow>,
    /// The write was skipped on request.
    #[serde(default)]
    pub dry_run: bool,
}

impl ReconciliationResult {
    pub fn failed(apartment_id: ApartmentId, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            apartment_id,
            action: Action::Failed,
            error: Some(Failure {
                kind,
                message: message.into(),
            }),
            window: None,
            dry_run: false,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.action == Action::Failed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").expect("datetime")
    }

    #[test]
    fn newtype_display() {
        assert_eq!(ApartmentId::from("12").to_string(), "12");
        assert_eq!(LockId::from("17890").to_string(), "17890");
    }

    #[test]
    fn pin_debug_is_redacted() {
        let pin = Pin::from("123456");
        assert_eq!(format!("{pin:?}"), "Pin(****)");
        assert!(pin.is_well_formed());
        assert!(!Pin::from("12a4").is_well_formed());
        assert!(!Pin::from("").is_well_formed());
    }

    #[test]
    fn stay_rejects_departure_before_arrival() {
        let a = NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
        let d = NaiveDate::from_ymd_opt(2025, 9, 5).unwrap();
        assert!(Stay::new(ApartmentId::from("1"), a, d).is_none());
        assert!(Stay::new(ApartmentId::from("1"), a, a).is_some());
    }

    #[test]
    fn inactive_window_has_no_times() {
        let w = DesiredWindow::inactive(ApartmentId::from("1"));
        assert!(!w.is_active());
        assert_eq!(w.valid_from(), None);
        assert_eq!(w.valid_until(), None);
    }

    #[test]
    fn active_window_exposes_bounds() {
        let w = DesiredWindow::active(
            ApartmentId::from("1"),
            at("2025-09-06T15:00"),
            at("2025-09-09T10:00"),
        );
        assert!(w.is_active());
        assert_eq!(w.valid_from(), Some(at("2025-09-06T15:00")));
        assert_eq!(w.valid_until(), Some(at("2025-09-09T10:00")));
    }

    #[test]
    fn action_serializes_uppercase() {
        let json = serde_yaml::to_string(&Action::Deactivated).expect("serialize");
        assert_eq!(json.trim(), "DEACTIVATED");
        assert_eq!(Action::Noop.to_string(), "NOOP");
    }
}
