//! Template context: serializable rendering payload built from a [`RunReport`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use keysync_core::ApartmentId;

use crate::report::RunReport;

const DATE_FORMAT: &str = "%d.%m.%Y";
const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportContext {
    /// `OK` or `ERROR`.
    pub status: String,
    pub product_name: String,
    /// Run date as `DD.MM.YYYY`.
    pub date: String,
    pub total: usize,
    pub failed: usize,
    pub entries: Vec<EntryCtx>,
}

/// One apartment line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryCtx {
    pub apartment_id: String,
    pub name: String,
    pub action: String,
    pub ok: bool,
    pub dry_run: bool,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl ReportContext {
    /// `names` maps apartment ids to display names; unknown ids fall back to the id.
    pub fn new(
        report: &RunReport,
        product_name: &str,
        date: NaiveDate,
        names: &BTreeMap<ApartmentId, String>,
    ) -> Self {
        let entries: Vec<EntryCtx> = report
            .entries
            .iter()
            .map(|entry| EntryCtx {
                apartment_id: entry.apartment_id.to_string(),
                name: names
                    .get(&entry.apartment_id)
                    .cloned()
                    .unwrap_or_else(|| entry.apartment_id.to_string()),
                action: entry.action.to_string(),
                ok: !entry.is_failed(),
                dry_run: entry.dry_run,
                valid_from: entry.window.map(|w| w.from.format(DATETIME_FORMAT).to_string()),
                valid_until: entry.window.map(|w| w.until.format(DATETIME_FORMAT).to_string()),
                error_kind: entry.error.as_ref().map(|e| e.kind.to_string()),
                error: entry.error.as_ref().map(|e| e.message.clone()),
            })
            .collect();

        Self {
            status: report.overall_status.to_string(),
            product_name: product_name.to_string(),
            date: date.format(DATE_FORMAT).to_string(),
            total: entries.len(),
            failed: entries.iter().filter(|e| !e.ok).count(),
            entries,
        }
    }
}
