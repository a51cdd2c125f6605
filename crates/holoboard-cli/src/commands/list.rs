use std::path::Path;

use anyhow::{Context, Result};
use holoboard_core::BoardConfig;

pub fn run(config: &Path, json: bool) -> Result<()> {
    let board_config = BoardConfig::load(config)
        .with_context(|| format!("Failed to load {}", config.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&board_config.boards)?);
        return Ok(());
    }

    if board_config.boards.is_empty() {
        println!("No boards configured in {}", config.display());
        return Ok(());
    }

    println!(
        "{:<16} {:<8} {:<6} {:<8} {:<28} COMMAND",
        "ID", "INTERVAL", "DELAY", "SENDER", "LOCATION"
    );
    for (id, def) in &board_config.boards {
        println!(
            "{:<16} {:<8} {:<6} {:<8} {:<28} {}",
            id,
            def.interval,
            def.delay,
            def.sender.to_string(),
            def.location.to_string(),
            def.command
        );
        for filter in &def.filters {
            println!("{:<16} filter: {}", "", filter);
        }
    }
    Ok(())
}
