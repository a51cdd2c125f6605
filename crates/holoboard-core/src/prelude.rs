//! Prelude module for convenient imports
//!
//! ```ignore
//! use holoboard_core::prelude::*;
//! ```

// Lifecycle
pub use crate::engine::Engine;
pub use crate::registry::Registry;

// Error handling
pub use crate::error::{Error, Result};

// Boards
pub use crate::board::{Board, BoardSettings, RefreshOutcome};
pub use crate::capture::SenderKind;
pub use crate::filter::FilterChain;
pub use crate::location::Location;
pub use crate::time::{Ticks, format_ticks, parse_ticks};

// Host collaborators
pub use crate::capture::{Actor, CommandSender, SyntheticPlayer};
pub use crate::host::{
    ActorProvider, CommandDispatcher, Host, HostBuilder, Scheduler, View, ViewFactory,
};
pub use crate::scheduler::TickScheduler;
