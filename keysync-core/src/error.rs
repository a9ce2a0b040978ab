//! Error types for keysync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ApartmentId, FailureKind};

/// All errors that can arise while loading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// A value parsed but failed validation.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Booking data could not be produced for an apartment.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The booking file could not be read.
    #[error("cannot read bookings for apartment {apartment} at {path}: {source}")]
    Io {
        apartment: ApartmentId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Required fields missing or malformed.
    #[error("invalid booking data for apartment {apartment}: {reason}")]
    Data {
        apartment: ApartmentId,
        reason: String,
    },
}

impl BookingError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::Data
    }
}

/// A lock gateway call failed.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network failure, timeout or server-side error.
    #[error("lock service unreachable: {0}")]
    Unreachable(String),

    /// Credential rejected.
    #[error("lock service rejected credentials: {0}")]
    Auth(String),

    /// The remote refused the request, e.g. concurrent modification.
    #[error("lock service rejected the change: {0}")]
    Conflict(String),
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::Unreachable(_) => FailureKind::Unreachable,
            GatewayError::Auth(_) => FailureKind::Auth,
            GatewayError::Conflict(_) => FailureKind::Conflict,
        }
    }
}
