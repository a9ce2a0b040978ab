//! # keysync-nuki
//!
//! [`LockGateway`](keysync_core::LockGateway) over the Nuki Web API.
//!
//! The shared guest code is the keypad authorization (type 13) whose name
//! matches the apartment's `code_name`. Its validity window is written as
//! UTC timestamps; everything the rest of keysync sees is site-local.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use keysync_nuki::NukiClient;
//!
//! let token = std::env::var("NUKI_ACCESS_TOKEN").unwrap_or_default();
//! let client = NukiClient::new("https://api.nuki.io", token, Duration::from_secs(20));
//! # let _ = client;
//! ```

pub mod client;
pub mod wire;

pub use client::{status_error, NukiClient};
