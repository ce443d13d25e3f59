//! CLI handler for `online-watch sites`.

use crate::cli::output;
use crate::config::{DEFAULT_SITE, SITES};
use anyhow::Result;

/// Run the sites command.
pub fn run() -> Result<()> {
    if output::is_json() {
        let sites: Vec<serde_json::Value> = SITES
            .iter()
            .map(|(key, base)| serde_json::json!({ "site": key, "base_url": base }))
            .collect();
        output::print_json(&sites);
        return Ok(());
    }

    for (key, base) in SITES {
        let marker = if *key == DEFAULT_SITE { " (default)" } else { "" };
        println!("  {key:<4} {base}{marker}");
    }
    Ok(())
}
