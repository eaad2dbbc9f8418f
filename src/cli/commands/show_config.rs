//! Config command - print the effective settings.

use anyhow::Context;

use crate::config::Settings;

/// Run the config command.
pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let text = settings.to_toml().context("cannot render settings")?;
    print!("{text}");
    Ok(())
}
