//! Folding per-apartment results into one run status.

use std::fmt;

use serde::{Deserialize, Serialize};

use keysync_core::ReconciliationResult;

/// `ERROR` as soon as one apartment failed; there is no warning tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Ok,
    Error,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallStatus::Ok => write!(f, "OK"),
            OverallStatus::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub overall_status: OverallStatus,
    pub entries: Vec<ReconciliationResult>,
}

impl RunReport {
    pub fn is_ok(&self) -> bool {
        self.overall_status == OverallStatus::Ok
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReconciliationResult> {
        self.entries.iter().filter(|e| e.is_failed())
    }
}

/// Pure fold: entries are kept in the order given.
pub fn aggregate(results: impl IntoIterator<Item = ReconciliationResult>) -> RunReport {
    let entries: Vec<_> = results.into_iter().collect();
    let overall_status = if entries.iter().any(ReconciliationResult::is_failed) {
        OverallStatus::Error
    } else {
        OverallStatus::Ok
    };
    RunReport {
        overall_status,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use keysync_core::{Action, ApartmentId, FailureKind};

    use super::*;

    fn result(id: &str, action: Action) -> ReconciliationResult {
        ReconciliationResult {
            apartment_id: ApartmentId::from(id),
            action,
            error: None,
            window: None,
            dry_run: false,
        }
    }

    #[test]
    fn empty_run_is_ok() {
        let report = aggregate(vec![]);
        assert_eq!(report.overall_status, OverallStatus::Ok);
        assert!(report.entries.is_empty());
    }

    #[test]
    fn all_successful_actions_are_ok() {
        let report = aggregate(vec![
            result("a", Action::Noop),
            result("b", Action::Activated),
            result("c", Action::Deactivated),
            result("d", Action::Updated),
        ]);
        assert!(report.is_ok());
        assert_eq!(report.failed().count(), 0);
    }

    #[test]
    fn one_failure_makes_the_run_an_error_and_keeps_order() {
        let report = aggregate(vec![
            result("a", Action::Noop),
            ReconciliationResult::failed(ApartmentId::from("b"), FailureKind::Unreachable, "timeout"),
            result("c", Action::Updated),
        ]);
        assert_eq!(report.overall_status, OverallStatus::Error);
        let ids: Vec<_> = report.entries.iter().map(|e| e.apartment_id.0.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(report.failed().count(), 1);
    }

    #[test]
    fn status_display() {
        assert_eq!(OverallStatus::Ok.to_string(), "OK");
        assert_eq!(OverallStatus::Error.to_string(), "ERROR");
    }
}
