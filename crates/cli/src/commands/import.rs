use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use waiter_core::menu::ingest::{normalize_records, RawMenuRecord};

use crate::commands::{CommandResult, EXIT_IO};

/// Converts a raw scrape dump into the menu file the catalog loads.
pub fn run(input: &Path, output: &Path) -> CommandResult {
    match import(input, output) {
        Ok(count) => CommandResult::success(
            "import",
            format!("imported {count} products from `{}` into `{}`", input.display(), output.display()),
        ),
        Err(error) => CommandResult::failure("import", "import_io", format!("{error:#}"), EXIT_IO),
    }
}

fn import(input: &Path, output: &Path) -> Result<usize> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("could not read raw menu `{}`", input.display()))?;
    let records: Vec<RawMenuRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("`{}` is not a JSON array of menu cards", input.display()))?;

    let products = normalize_records(records);
    let rendered = serde_json::to_string_pretty(&products).context("could not render menu")?;
    fs::write(output, rendered)
        .with_context(|| format!("could not write menu `{}`", output.display()))?;
    info!(
        event_name = "cli.import.completed",
        input = %input.display(),
        output = %output.display(),
        products = products.len(),
        "menu imported"
    );

    Ok(products.len())
}
