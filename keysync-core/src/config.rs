//! YAML configuration: apartments, check-in/check-out defaults, runner and
//! gateway settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.keysync/
//!   config.yaml      (mode 0600, holds pins; created by `keysync init`)
//! ```
//!
//! Booking paths inside the file are resolved relative to the directory that
//! contains it.
//!
//! # API pattern
//!
//! Functions that locate the file have two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{invalid, io_err, ConfigError};
use crate::types::{ApartmentConfig, ApartmentId, LockId, Pin};

pub const CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_CHECKIN: &str = "15:00";
pub const DEFAULT_CHECKOUT: &str = "11:00";
pub const DEFAULT_RUN_TIME: &str = "05:00";
pub const DEFAULT_PRODUCT_NAME: &str = "Keysync";
pub const DEFAULT_CODE_NAME: &str = "Guests";
pub const DEFAULT_NUKI_BASE_URL: &str = "https://api.nuki.io";
pub const DEFAULT_TOKEN_ENV: &str = "NUKI_ACCESS_TOKEN";

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Worker pool and reconciliation tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerSettings {
    pub workers: usize,
    pub call_timeout_secs: u64,
    pub unit_timeout_secs: u64,
    pub force_sync_after_change: bool,
    pub tolerance_secs: u64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            call_timeout_secs: 20,
            unit_timeout_secs: 60,
            force_sync_after_change: false,
            tolerance_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NukiSettings {
    pub base_url: String,
    /// Name of the environment variable holding the bearer token.
    pub token_env: String,
}

impl Default for NukiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NUKI_BASE_URL.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    /// Directory of `*.tera` files overriding the embedded report templates.
    pub template_dir: Option<PathBuf>,
}

/// Fully validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub checkin_time: NaiveTime,
    pub checkout_time: NaiveTime,
    /// Only meaningful to whatever schedules `keysync run`.
    pub run_time: NaiveTime,
    pub product_name: String,
    pub runner: RunnerSettings,
    pub nuki: NukiSettings,
    pub report: ReportSettings,
    pub apartments: BTreeMap<ApartmentId, ApartmentConfig>,
}

// ---------------------------------------------------------------------------
// On-disk shape
// ---------------------------------------------------------------------------

/// Accepts `123` as well as `"123"` for ids and pins.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(u64),
    Str(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Str(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    checkin_time: Option<String>,
    checkout_time: Option<String>,
    run_time: Option<String>,
    product_name: Option<String>,
    #[serde(default)]
    runner: RunnerSettings,
    #[serde(default)]
    nuki: NukiSettings,
    #[serde(default)]
    report: ReportSettings,
    #[serde(default)]
    apartments: BTreeMap<String, RawApartment>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawApartment {
    name: Option<String>,
    lock_id: Scalar,
    pin: Option<Scalar>,
    code_name: Option<String>,
    bookings: PathBuf,
    checkin_time: Option<String>,
    checkout_time: Option<String>,
}

// ---------------------------------------------------------------------------
// 1. Paths
// ---------------------------------------------------------------------------

/// `<home>/.keysync/`
pub fn keysync_dir_at(home: &Path) -> PathBuf {
    home.join(".keysync")
}

/// `<home>/.keysync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    keysync_dir_at(home).join(CONFIG_FILE)
}

/// `config_path_at` convenience wrapper.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate the config file at `path`.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if malformed, `ConfigError::Invalid` if a value fails
/// validation.
pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let raw: RawConfig = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    resolve(raw, base_dir)
}

/// Load `<home>/.keysync/config.yaml`.
pub fn load_at(home: &Path) -> Result<Settings, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, ConfigError> {
    load_at(&home()?)
}

/// Parse and validate YAML text. Relative booking and template paths resolve
/// against `base_dir`.
pub fn parse_str(yaml: &str, base_dir: &Path) -> Result<Settings, ConfigError> {
    let raw: RawConfig = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
        path: PathBuf::from("<inline>"),
        source: e,
    })?;
    resolve(raw, base_dir)
}

fn resolve(raw: RawConfig, base_dir: &Path) -> Result<Settings, ConfigError> {
    let checkin_time = time_field("checkin_time", raw.checkin_time.as_deref(), DEFAULT_CHECKIN)?;
    let checkout_time =
        time_field("checkout_time", raw.checkout_time.as_deref(), DEFAULT_CHECKOUT)?;
    let run_time = time_field("run_time", raw.run_time.as_deref(), DEFAULT_RUN_TIME)?;

    let runner = raw.runner;
    if runner.workers == 0 {
        return Err(invalid("runner.workers", "must be at least 1"));
    }
    if runner.call_timeout_secs == 0 {
        return Err(invalid("runner.call_timeout_secs", "must be greater than 0"));
    }
    if runner.unit_timeout_secs == 0 {
        return Err(invalid("runner.unit_timeout_secs", "must be greater than 0"));
    }

    let mut nuki = raw.nuki;
    nuki.base_url = nuki.base_url.trim().trim_end_matches('/').to_string();
    if nuki.base_url.is_empty() {
        return Err(invalid("nuki.base_url", "must not be empty"));
    }
    if nuki.token_env.trim().is_empty() {
        return Err(invalid("nuki.token_env", "must not be empty"));
    }

    let product_name = raw
        .product_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string());

    if raw.apartments.is_empty() {
        return Err(invalid("apartments", "no apartments configured"));
    }

    let mut apartments = BTreeMap::new();
    for (key, entry) in raw.apartments {
        let id = key.trim().to_string();
        if id.is_empty() {
            return Err(invalid("apartments", "apartment id must not be empty"));
        }
        let field = |name: &str| format!("apartments.{id}.{name}");

        let lock_id = entry.lock_id.into_string();
        if lock_id.is_empty() {
            return Err(invalid(field("lock_id"), "must not be empty"));
        }

        let pin = match entry.pin {
            Some(scalar) => {
                let pin = Pin(scalar.into_string());
                if !pin.is_well_formed() {
                    return Err(invalid(field("pin"), "must contain digits only"));
                }
                Some(pin)
            }
            None => None,
        };

        let code_name = match entry.code_name {
            Some(name) if name.trim().is_empty() => {
                return Err(invalid(field("code_name"), "must not be empty"));
            }
            Some(name) => name.trim().to_string(),
            None => DEFAULT_CODE_NAME.to_string(),
        };

        let apartment_checkin = match entry.checkin_time.as_deref() {
            Some(raw) => parse_time(raw)
                .ok_or_else(|| invalid(field("checkin_time"), format!("'{raw}' is not HH:MM")))?,
            None => checkin_time,
        };
        let apartment_checkout = match entry.checkout_time.as_deref() {
            Some(raw) => parse_time(raw)
                .ok_or_else(|| invalid(field("checkout_time"), format!("'{raw}' is not HH:MM")))?,
            None => checkout_time,
        };

        let bookings = if entry.bookings.is_absolute() {
            entry.bookings
        } else {
            base_dir.join(entry.bookings)
        };

        let name = entry
            .name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("Apartment {id}"));

        let apartment_id = ApartmentId::from(id.clone());
        apartments.insert(
            apartment_id.clone(),
            ApartmentConfig {
                id: apartment_id,
                name,
                lock_id: LockId::from(lock_id),
                pin,
                code_name,
                checkin_time: apartment_checkin,
                checkout_time: apartment_checkout,
                bookings,
            },
        );
    }

    let mut report = raw.report;
    report.template_dir = report.template_dir.map(|dir| {
        if dir.is_absolute() {
            dir
        } else {
            base_dir.join(dir)
        }
    });

    Ok(Settings {
        checkin_time,
        checkout_time,
        run_time,
        product_name,
        runner,
        nuki,
        report,
        apartments,
    })
}

fn time_field(field: &str, raw: Option<&str>, default: &str) -> Result<NaiveTime, ConfigError> {
    let raw = raw.unwrap_or(default);
    parse_time(raw).ok_or_else(|| invalid(field, format!("'{raw}' is not HH:MM")))
}

/// Parse a day-local time in `HH:MM` or `HH:MM:SS` form.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

// ---------------------------------------------------------------------------
// 3. Init (atomic)
// ---------------------------------------------------------------------------

const STARTER_CONFIG: &str = r#"# keysync configuration
#
# Times are site-local HH:MM. run_time is read only by whatever schedules
# `keysync run` (cron, systemd timer, ...).
checkin_time: "15:00"
checkout_time: "11:00"
run_time: "05:00"
product_name: "Keysync"

runner:
  workers: 4
  call_timeout_secs: 20
  unit_timeout_secs: 60
  force_sync_after_change: false
  tolerance_secs: 60

nuki:
  base_url: "https://api.nuki.io"
  token_env: "NUKI_ACCESS_TOKEN"

apartments:
  "1":
    name: "Apartment 1"
    lock_id: "123456789"
    # pin is only needed if the shared code does not exist on the lock yet
    # pin: "135790"
    code_name: "Guests"
    bookings: "bookings/1.yaml"
"#;

/// Write a starter config to `<home>/.keysync/config.yaml` unless one exists.
///
/// Write flow: `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// Returns the path and whether a file was created.
pub fn init_at(home: &Path) -> Result<(PathBuf, bool), ConfigError> {
    let dir = keysync_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }

    let path = config_path_at(home);
    if path.exists() {
        return Ok((path, false));
    }

    let tmp = path.with_file_name(format!("{CONFIG_FILE}.tmp"));
    std::fs::write(&tmp, STARTER_CONFIG).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok((path, true))
}

/// `init_at` convenience wrapper.
pub fn init() -> Result<(PathBuf, bool), ConfigError> {
    init_at(&home()?)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MINIMAL: &str = r#"
apartments:
  "12":
    lock_id: 17890
    bookings: "b/12.yaml"
"#;

    #[test]
    fn minimal_config_applies_defaults() {
        let settings = parse_str(MINIMAL, Path::new("/etc/keysync")).expect("parse");
        assert_eq!(settings.checkin_time, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(settings.checkout_time, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
        assert_eq!(settings.product_name, "Keysync");
        assert_eq!(settings.runner, RunnerSettings::default());

        let apt = &settings.apartments[&ApartmentId::from("12")];
        assert_eq!(apt.name, "Apartment 12");
        assert_eq!(apt.lock_id, LockId::from("17890"));
        assert_eq!(apt.code_name, "Guests");
        assert_eq!(apt.pin, None);
        assert_eq!(apt.bookings, PathBuf::from("/etc/keysync/b/12.yaml"));
        assert_eq!(apt.checkin_time, settings.checkin_time);
    }

    #[test]
    fn per_apartment_times_override_defaults() {
        let yaml = r#"
checkin_time: "14:30"
checkout_time: "10:00"
apartments:
  a:
    lock_id: "1"
    bookings: /abs/a.json
    checkin_time: "16:00"
  b:
    lock_id: "2"
    bookings: b.json
"#;
        let settings = parse_str(yaml, Path::new("/cfg")).expect("parse");
        let a = &settings.apartments[&ApartmentId::from("a")];
        let b = &settings.apartments[&ApartmentId::from("b")];
        assert_eq!(a.checkin_time, NaiveTime::from_hms_opt(16, 0, 0).unwrap());
        assert_eq!(a.checkout_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(a.bookings, PathBuf::from("/abs/a.json"));
        assert_eq!(b.checkin_time, NaiveTime::from_hms_opt(14, 30, 0).unwrap());
    }

    #[test]
    fn empty_apartment_set_is_rejected() {
        let err = parse_str("checkin_time: \"15:00\"\n", Path::new("/")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "apartments"));
    }

    #[test]
    fn non_digit_pin_is_rejected() {
        let yaml = r#"
apartments:
  x:
    lock_id: 1
    pin: "12ab"
    bookings: x.yaml
"#;
        let err = parse_str(yaml, Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("apartments.x.pin"), "got: {err}");
    }

    #[test]
    fn numeric_pin_is_accepted() {
        let yaml = r#"
apartments:
  x:
    lock_id: 1
    pin: 135790
    bookings: x.yaml
"#;
        let settings = parse_str(yaml, Path::new("/")).expect("parse");
        let pin = settings.apartments[&ApartmentId::from("x")].pin.clone();
        assert_eq!(pin, Some(Pin::from("135790")));
    }

    #[test]
    fn malformed_time_names_the_field() {
        let yaml = r#"
checkout_time: "25:99"
apartments:
  x:
    lock_id: 1
    bookings: x.yaml
"#;
        let err = parse_str(yaml, Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("checkout_time"), "got: {err}");
    }

    #[test]
    fn zero_workers_is_rejected() {
        let yaml = r#"
runner:
  workers: 0
apartments:
  x:
    lock_id: 1
    bookings: x.yaml
"#;
        let err = parse_str(yaml, Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("runner.workers"), "got: {err}");
    }

    #[test]
    fn relative_template_dir_resolves_against_config_dir() {
        let yaml = format!("{MINIMAL}report:\n  template_dir: templates\n");
        let settings = parse_str(&yaml, Path::new("/etc/keysync")).expect("parse");
        assert_eq!(
            settings.report.template_dir,
            Some(PathBuf::from("/etc/keysync/templates"))
        );
    }

    #[rstest]
    #[case("05:00:30", NaiveTime::from_hms_opt(5, 0, 30))]
    #[case(" 15:00 ", NaiveTime::from_hms_opt(15, 0, 0))]
    #[case("23:59", NaiveTime::from_hms_opt(23, 59, 0))]
    #[case("3pm", None)]
    #[case("25:00", None)]
    #[case("", None)]
    fn parse_time_cases(#[case] raw: &str, #[case] expected: Option<NaiveTime>) {
        assert_eq!(parse_time(raw), expected);
    }

    #[test]
    fn starter_config_is_valid() {
        let settings = parse_str(STARTER_CONFIG, Path::new("/home/x/.keysync")).expect("parse");
        assert_eq!(settings.apartments.len(), 1);
        assert_eq!(settings.nuki.base_url, "https://api.nuki.io");
    }
}
