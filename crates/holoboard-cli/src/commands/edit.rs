//! Offline edits of the board config file.

use std::path::Path;

use anyhow::{Context, Result};
use holoboard_core::BoardConfig;
use holoboard_core::admin::AdminCommand;

/// Apply `edit` to the config at `config` and write it back.
pub fn run(config: &Path, edit: &AdminCommand) -> Result<String> {
    let mut board_config = BoardConfig::load(config)
        .with_context(|| format!("Failed to load {}", config.display()))?;
    let reply = edit.apply(&mut board_config)?;
    board_config
        .save(config)
        .with_context(|| format!("Failed to save {}", config.display()))?;
    Ok(reply)
}
