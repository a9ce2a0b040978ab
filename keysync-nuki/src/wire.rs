//! JSON shapes of the Nuki Web API and the site-local ↔ UTC conversions.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use keysync_core::{GatewayError, LockCodeState, LockId, Pin};

/// Keypad code authorization type.
pub const KEYPAD_CODE: u8 = 13;
/// Every day of the week (bitmask, Monday = 64 … Sunday = 1).
pub const ALL_WEEK_DAYS: u8 = 127;

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One entry of `GET /smartlock/{id}/auth`. Only the fields we read.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEntry {
    #[serde(default, alias = "authId", alias = "authID")]
    pub id: Option<Value>,
    #[serde(rename = "type", default)]
    pub kind: Option<u8>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_from_date: Option<String>,
    #[serde(default)]
    pub allowed_until_date: Option<String>,
}

impl AuthEntry {
    /// Auth id as used in URLs; the API has sent both strings and numbers.
    pub fn auth_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Keypad code whose name equals `code_name`, ignoring case and padding.
    pub fn is_shared_code(&self, code_name: &str) -> bool {
        self.kind == Some(KEYPAD_CODE)
            && self
                .name
                .as_deref()
                .is_some_and(|n| n.trim().to_lowercase() == code_name.trim().to_lowercase())
    }

    /// Remote state in site-local time. An enabled code is active whatever its
    /// dates say: a missing bound means no limit on that side. An unreadable
    /// bound reads as absent.
    pub fn state<Tz: TimeZone>(&self, tz: &Tz) -> LockCodeState {
        LockCodeState {
            active: self.enabled,
            valid_from: self.allowed_from_date.as_deref().and_then(|s| from_remote(s, tz)),
            valid_until: self.allowed_until_date.as_deref().and_then(|s| from_remote(s, tz)),
        }
    }
}

/// Find the shared code in a listing.
pub fn find_shared<'a>(entries: &'a [AuthEntry], code_name: &str) -> Option<&'a AuthEntry> {
    entries.iter().find(|e| e.is_shared_code(code_name))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /smartlock/{id}/auth/{authId}`. `None` dates serialize as
/// `null`, which clears them on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuth {
    pub enabled: bool,
    pub allowed_from_date: Option<String>,
    pub allowed_until_date: Option<String>,
    pub allowed_week_days: u8,
}

/// Body of `PUT /smartlock/auth`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuth {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub code: u64,
    pub smartlock_ids: Vec<Value>,
    pub allowed_week_days: u8,
    pub allowed_from_date: String,
    pub allowed_until_date: String,
}

/// Numeric lock ids go out as JSON numbers, anything else as a string.
pub fn lock_id_value(lock_id: &LockId) -> Value {
    match lock_id.0.parse::<u64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(lock_id.0.clone()),
    }
}

pub fn pin_value(pin: &Pin) -> Result<u64, GatewayError> {
    pin.as_str()
        .parse::<u64>()
        .map_err(|_| GatewayError::Conflict("configured pin is not a number".to_string()))
}

// ---------------------------------------------------------------------------
// Time conversion
// ---------------------------------------------------------------------------

/// Parse an API timestamp (`2025-09-06T13:00:00.000Z`) into site-local wall
/// time. A value without offset is taken as UTC.
pub fn from_remote<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let utc = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
            Utc.from_utc_datetime(&naive)
        }
    };
    Some(utc.with_timezone(tz).naive_local())
}

/// Format site-local wall time as an API timestamp in UTC.
///
/// Ambiguous times (clocks going back) take the earlier instant; times that
/// do not exist (clocks going forward) are pushed past the gap.
pub fn to_remote<Tz: TimeZone>(local: NaiveDateTime, tz: &Tz) -> String {
    let utc = match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(early, _) => early.with_timezone(&Utc),
        LocalResult::None => match tz.from_local_datetime(&(local + Duration::hours(1))) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => Utc.from_utc_datetime(&local),
        },
    };
    utc.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
