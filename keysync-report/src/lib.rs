//! # keysync-report
//!
//! Folds per-apartment results into a [`RunReport`] and renders it as a mail
//! subject and body with Tera.
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use keysync_report::{aggregate, ReportContext, ReportRenderer};
//!
//! let report = aggregate(vec![]);
//! let today = chrono::NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
//! let ctx = ReportContext::new(&report, "Keysync", today, &BTreeMap::new());
//! if let Ok(renderer) = ReportRenderer::new() {
//!     if let Ok(rendered) = renderer.render(&ctx) {
//!         println!("{}\n\n{}", rendered.subject, rendered.body);
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod report;

pub use context::ReportContext;
pub use engine::{RenderedReport, ReportRenderer};
pub use error::RenderError;
pub use report::{aggregate, OverallStatus, RunReport};
