//! Headless host: everything the engine needs from a server, provided by
//! local processes and plain files.

mod actors;
mod dispatcher;
mod views;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use holoboard_core::{HostBuilder, TickScheduler};

pub use actors::HeadlessActors;
pub use dispatcher::ProcessDispatcher;
pub use views::FileViews;

/// Wire the headless collaborators around `scheduler`
pub fn builder(
    scheduler: Arc<TickScheduler>,
    output: &Path,
    command_timeout: Duration,
) -> Result<HostBuilder> {
    Ok(holoboard_core::Host::builder()
        .scheduler(scheduler)
        .dispatcher(Arc::new(ProcessDispatcher::new(command_timeout)))
        .views(Arc::new(FileViews::new(output)?))
        .actors(Arc::new(HeadlessActors)))
}
