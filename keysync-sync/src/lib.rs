//! # keysync-sync
//!
//! The reconciliation core: turn an apartment's stays into the desired
//! validity window for today ([`planner`]), compare it with the lock
//! ([`reconcile`]) and tie both together per apartment ([`pipeline`]).
//!
//! Nothing here reads the clock; `now` is always passed in.

pub mod pipeline;
pub mod planner;
pub mod reconcile;

pub use pipeline::{desired_window, run_apartment};
pub use planner::{partition, plan, TodayStays};
pub use reconcile::{reconcile, states_match, ReconcileOptions};
