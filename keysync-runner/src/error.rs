use thiserror::Error;

/// Host-level failures of a run. Per-apartment failures never end up here;
/// they are entries of the report.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("cannot start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
