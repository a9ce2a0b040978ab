//! Keysync core library: domain types, configuration, errors and the two
//! ports (bookings in, locks out).
//!
//! - [`types`]: newtypes, stays, windows, lock state, reconciliation results
//! - [`error`]: [`ConfigError`], [`BookingError`], [`GatewayError`]
//! - [`config`]: load / validate / init `~/.keysync/config.yaml`
//! - [`ports`]: [`BookingSource`] and [`LockGateway`]
//! - [`memory`]: in-memory implementations of both ports

pub mod config;
pub mod error;
pub mod memory;
pub mod ports;
pub mod types;

pub use config::Settings;
pub use error::{BookingError, ConfigError, GatewayError};
pub use ports::{BookingSource, LockGateway};
pub use types::{
    Action, ApartmentConfig, ApartmentId, CodeSlot, DesiredWindow, Failure, FailureKind,
    LockCodeState, LockId, Pin, ReconciliationResult, Stay, ValidityWindow,
};
