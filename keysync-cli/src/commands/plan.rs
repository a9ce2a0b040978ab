//! `keysync plan`: desired windows from the booking files, no lock access.

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use keysync_bookings::FileBookingSource;
use keysync_core::{ApartmentConfig, ApartmentId, DesiredWindow};
use keysync_sync::desired_window;

use super::{now_or, parse_at, ConfigArgs, DISPLAY_DATETIME};

/// Arguments for `keysync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Only plan this apartment.
    pub apartment: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Plan as of this local time instead of now, e.g. 2025-09-06T05:00.
    #[arg(long, value_parser = parse_at)]
    pub at: Option<NaiveDateTime>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        keysync_runner::init_tracing();
        let settings = self.config.load()?;
        let now = now_or(self.at);

        let apartments: Vec<&ApartmentConfig> = match &self.apartment {
            Some(id) => {
                let id = ApartmentId::from(id.as_str());
                match settings.apartments.get(&id) {
                    Some(apartment) => vec![apartment],
                    None => bail!(
                        "unknown apartment '{id}' (configured: {})",
                        settings
                            .apartments
                            .keys()
                            .map(|k| k.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                }
            }
            None => settings.apartments.values().collect(),
        };

        let source = FileBookingSource::new();
        let plans: Vec<PlanEntry> = apartments
            .into_iter()
            .map(|apartment| PlanEntry {
                apartment_id: apartment.id.to_string(),
                name: apartment.name.clone(),
                outcome: desired_window(apartment, &source, now).map_err(|e| e.to_string()),
            })
            .collect();
        let failed = plans.iter().filter(|p| p.outcome.is_err()).count();

        if self.json {
            print_json(&plans, now)?;
        } else {
            print_table(plans, now);
        }

        if failed > 0 {
            bail!("{failed} apartment(s) have unusable bookings");
        }
        Ok(())
    }
}

struct PlanEntry {
    apartment_id: String,
    name: String,
    outcome: Result<DesiredWindow, String>,
}

#[derive(Serialize)]
struct PlanJson<'a> {
    apartment_id: &'a str,
    name: &'a str,
    active: bool,
    valid_from: Option<NaiveDateTime>,
    valid_until: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct PlanReportJson<'a> {
    at: NaiveDateTime,
    apartments: Vec<PlanJson<'a>>,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "apartment")]
    apartment: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "code")]
    state: String,
    #[tabled(rename = "valid from")]
    from: String,
    #[tabled(rename = "valid until")]
    until: String,
}

fn print_json(plans: &[PlanEntry], now: NaiveDateTime) -> Result<()> {
    let entries: Vec<PlanJson<'_>> = plans
        .iter()
        .map(|plan| {
            let window = plan.outcome.as_ref().ok().and_then(|d| d.window);
            PlanJson {
                apartment_id: &plan.apartment_id,
                name: &plan.name,
                active: window.is_some(),
                valid_from: window.map(|w| w.from),
                valid_until: window.map(|w| w.until),
                error: plan.outcome.as_ref().err().map(String::as_str),
            }
        })
        .collect();
    let payload = PlanReportJson {
        at: now,
        apartments: entries,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
    );
    Ok(())
}

fn print_table(plans: Vec<PlanEntry>, now: NaiveDateTime) {
    println!("Desired codes as of {}", now.format(DISPLAY_DATETIME));

    let mut errors = Vec::new();
    let rows: Vec<PlanRow> = plans
        .into_iter()
        .map(|plan| {
            let (state, from, until) = match &plan.outcome {
                Ok(desired) => match desired.window {
                    Some(w) => (
                        "ACTIVE".green().to_string(),
                        w.from.format(DISPLAY_DATETIME).to_string(),
                        w.until.format(DISPLAY_DATETIME).to_string(),
                    ),
                    None => ("INACTIVE".bright_black().to_string(), "-".into(), "-".into()),
                },
                Err(message) => {
                    errors.push(format!("{}: {message}", plan.apartment_id));
                    ("ERROR".red().bold().to_string(), "-".into(), "-".into())
                }
            };
            PlanRow {
                apartment: plan.apartment_id,
                name: plan.name,
                state,
                from,
                until,
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    for error in errors {
        println!("{} {error}", "✗".red());
    }
}
