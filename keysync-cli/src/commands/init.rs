//! `keysync init`

use anyhow::{Context, Result};
use clap::Args;

use keysync_core::config;

/// Write a starter config unless one exists.
#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let (path, created) = config::init().context("failed to write starter config")?;
        if created {
            println!("✓ Wrote starter config to {}", path.display());
            println!("  Edit the apartments section, then run `keysync check`.");
        } else {
            println!("✓ Config already exists at {}", path.display());
        }
        Ok(())
    }
}
