//! List command - walk once and print the registry.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};

use crate::config::Settings;
use crate::registry::{FileEntry, Registrar};

/// Run the list command.
pub fn run(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let registrar = Registrar::from_settings(settings);
    let report = registrar.register_all();

    for failure in &report.failures {
        eprintln!("warning: {failure}");
    }

    let mut entries = registrar.registry().snapshot();
    entries.sort_by(|a, b| a.url.cmp(&b.url));

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{}", render_table(&entries));
        eprintln!("{} files", entries.len());
    }

    Ok(())
}

fn render_table(entries: &[FileEntry]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Label", "Type", "URL", "Path"]);

    for entry in entries {
        table.add_row(vec![
            entry.label.clone(),
            entry.kind.clone(),
            entry.url.clone(),
            entry.absolute_path.display().to_string(),
        ]);
    }

    table
}
