//! One forced refresh of every configured board.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use holoboard_core::{BoardConfig, RefreshState, Registry, TickScheduler};

use crate::cli::HostArgs;
use crate::shutdown::ShutdownSignal;
use crate::{clock, host};

pub fn run(config: &Path, args: &HostArgs) -> Result<()> {
    let board_config = BoardConfig::load(config)
        .with_context(|| format!("Failed to load {}", config.display()))?;
    if board_config.boards.is_empty() {
        println!("No boards configured in {}", config.display());
        return Ok(());
    }

    let scheduler = Arc::new(TickScheduler::new());
    let host = host::builder(Arc::clone(&scheduler), &args.output, args.command_timeout())?
        .messages(board_config.messages.clone())
        .build()?;

    // Boards are registered but never scheduled; this is a single cycle
    let registry = Registry::new(host);
    for (id, definition) in &board_config.boards {
        registry.add(Arc::new(definition.to_board(id)))?;
    }

    let outcomes = registry.refresh_all();
    let shutdown = ShutdownSignal::new();
    clock::run_until(&scheduler, args.tick(), &shutdown, || {
        registry
            .boards()
            .iter()
            .all(|board| board.state() == RefreshState::Idle)
    });

    for (id, outcome) in outcomes {
        let Some(board) = registry.get(&id) else {
            continue;
        };
        println!("== {} ({:?}) ==", id, outcome);
        println!("{}", board.last_output().unwrap_or_default().trim_end());
    }
    Ok(())
}
