//! Bounded-parallel run over all configured apartments.
//!
//! [`run_once`] is the single entry point: it never fails because of an
//! apartment, only the returned [`RunReport`](keysync_report::RunReport)
//! says how each one went.

mod error;
mod runtime;

pub use error::RunnerError;
pub use runtime::{init_tracing, run_once, run_once_blocking, RunOptions};
