//! Long running host mode.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use holoboard_core::{Engine, TickScheduler};
use tracing::info;

use crate::cli::HostArgs;
use crate::shutdown::ShutdownSignal;
use crate::{clock, console, host};

/// Host the engine until Ctrl+C or `quit`
pub fn run(config: &Path, args: &HostArgs, load_now: bool) -> Result<()> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    info!("Holoboard {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config.display());
    info!("Rendering into {}", args.output.display());

    let scheduler = Arc::new(TickScheduler::new().with_async_offload());
    let builder = host::builder(Arc::clone(&scheduler), &args.output, args.command_timeout())?;
    let engine = Arc::new(Engine::enable(builder, config));
    if !engine.is_active() {
        bail!("Engine failed to start");
    }
    if load_now {
        engine.load_now()?;
    }

    let _console = console::spawn(Arc::clone(&engine), Arc::clone(&shutdown));
    println!("Holoboard running. Type `help` for commands, `quit` to stop.");

    clock::run(&scheduler, args.tick(), &shutdown);

    engine
        .disable()
        .with_context(|| format!("Failed to save boards to {}", config.display()))?;
    info!("Stopped");
    Ok(())
}
