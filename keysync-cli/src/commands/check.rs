//! `keysync check`: config validation and apartment overview.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use keysync_core::{ApartmentConfig, Settings};

use super::ConfigArgs;

/// Arguments for `keysync check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.config.load()?;
        let rows: Vec<ApartmentRow> = settings.apartments.values().map(ApartmentRow::from).collect();

        if self.json {
            let payload = CheckJson {
                checkin_time: settings.checkin_time.format("%H:%M").to_string(),
                checkout_time: settings.checkout_time.format("%H:%M").to_string(),
                run_time: settings.run_time.format("%H:%M").to_string(),
                workers: settings.runner.workers,
                apartments: rows,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize check JSON")?
            );
            return Ok(());
        }

        print_table(&settings, rows);
        Ok(())
    }
}

#[derive(Debug, Serialize, Tabled)]
struct ApartmentRow {
    #[tabled(rename = "apartment")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "lock")]
    lock_id: String,
    #[tabled(rename = "code")]
    code_name: String,
    #[tabled(rename = "check-in")]
    checkin: String,
    #[tabled(rename = "check-out")]
    checkout: String,
    #[tabled(rename = "pin")]
    #[serde(rename = "pin_configured")]
    pin: bool,
    #[tabled(rename = "bookings")]
    bookings: String,
    #[tabled(skip)]
    bookings_found: bool,
}

impl From<&ApartmentConfig> for ApartmentRow {
    fn from(apartment: &ApartmentConfig) -> Self {
        Self {
            id: apartment.id.to_string(),
            name: apartment.name.clone(),
            lock_id: apartment.lock_id.to_string(),
            code_name: apartment.code_name.clone(),
            checkin: apartment.checkin_time.format("%H:%M").to_string(),
            checkout: apartment.checkout_time.format("%H:%M").to_string(),
            pin: apartment.pin.is_some(),
            bookings: apartment.bookings.display().to_string(),
            bookings_found: apartment.bookings.is_file(),
        }
    }
}

#[derive(Serialize)]
struct CheckJson {
    checkin_time: String,
    checkout_time: String,
    run_time: String,
    workers: usize,
    apartments: Vec<ApartmentRow>,
}

fn print_table(settings: &Settings, rows: Vec<ApartmentRow>) {
    println!(
        "{} v{} | {} apartments | check-in {} | check-out {} | runs at {}",
        settings.product_name,
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        settings.checkin_time.format("%H:%M"),
        settings.checkout_time.format("%H:%M"),
        settings.run_time.format("%H:%M"),
    );

    let missing: Vec<String> = rows
        .iter()
        .filter(|r| !r.bookings_found)
        .map(|r| r.id.clone())
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if missing.is_empty() {
        println!("{}", "✓ Config is valid".green());
    } else {
        println!(
            "{} booking file missing for: {}",
            "!".yellow().bold(),
            missing.join(", ")
        );
    }
}
