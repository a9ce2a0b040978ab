//! `keysync run`: one reconciliation pass over every apartment.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::Args;

use keysync_bookings::FileBookingSource;
use keysync_core::{ApartmentId, Settings};
use keysync_nuki::NukiClient;
use keysync_report::{RenderedReport, ReportContext, ReportRenderer, RunReport};
use keysync_runner::{init_tracing, run_once_blocking, RunOptions};

use super::{now_or, parse_at, ConfigArgs};

/// Arguments for `keysync run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Run as of this local time instead of now, e.g. 2025-09-06T05:00.
    #[arg(long, value_parser = parse_at)]
    pub at: Option<NaiveDateTime>,

    /// Read every lock and report what would change, without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON instead of the rendered text.
    #[arg(long)]
    pub json: bool,

    /// Also write the rendered subject and body to this file.
    #[arg(long, value_name = "PATH")]
    pub report_out: Option<PathBuf>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        init_tracing();
        let settings = self.config.load()?;
        let now = now_or(self.at);

        let token = std::env::var(&settings.nuki.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .with_context(|| {
                format!(
                    "environment variable {} must hold the Nuki API token",
                    settings.nuki.token_env
                )
            })?;
        let gateway = NukiClient::new(
            &settings.nuki.base_url,
            token,
            Duration::from_secs(settings.runner.call_timeout_secs),
        );

        let report = run_once_blocking(
            settings.apartments.clone(),
            now,
            Arc::new(FileBookingSource::new()),
            Arc::new(gateway),
            RunOptions::from_settings(&settings.runner, self.dry_run),
        )
        .context("run failed")?;

        let rendered = render(&settings, &report, now)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
        } else {
            println!("{}\n\n{}", rendered.subject, rendered.body);
        }

        if let Some(path) = &self.report_out {
            std::fs::write(path, format!("{}\n\n{}\n", rendered.subject, rendered.body))
                .with_context(|| format!("failed to write report to '{}'", path.display()))?;
        }

        if !report.is_ok() {
            bail!("{} apartment(s) failed", report.failed().count());
        }
        Ok(())
    }
}

fn render(settings: &Settings, report: &RunReport, now: NaiveDateTime) -> Result<RenderedReport> {
    let names: BTreeMap<ApartmentId, String> = settings
        .apartments
        .iter()
        .map(|(id, apartment)| (id.clone(), apartment.name.clone()))
        .collect();
    let renderer = ReportRenderer::with_overrides(settings.report.template_dir.as_deref())
        .context("failed to load report templates")?;
    let ctx = ReportContext::new(report, &settings.product_name, now.date(), &names);
    renderer.render(&ctx).context("failed to render report")
}
