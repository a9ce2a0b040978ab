pub mod check;
pub mod init;
pub mod plan;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Args;

use keysync_core::{config, Settings};

pub(crate) const DISPLAY_DATETIME: &str = "%d.%m.%Y %H:%M";

/// `--config`, shared by every command that reads the config.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config file to use instead of ~/.keysync/config.yaml.
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<Settings> {
        match &self.config {
            Some(path) => config::load_from(path)
                .with_context(|| format!("failed to load config '{}'", path.display())),
            None => config::load().context("failed to load config; run `keysync init` first"),
        }
    }
}

/// Parse `--at` as site-local `YYYY-MM-DDTHH:MM[:SS]` (a space works too).
pub fn parse_at(raw: &str) -> Result<NaiveDateTime, String> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .ok_or_else(|| format!("'{raw}' is not a local date-time like 2025-09-06T05:00"))
}

/// `--at` if given, else the current local time.
pub fn now_or(at: Option<NaiveDateTime>) -> NaiveDateTime {
    at.unwrap_or_else(|| Local::now().naive_local())
}
