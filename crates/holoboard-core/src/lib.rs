//! # holoboard-core
//!
//! Engine for command-driven floating scoreboards.
//!
//! A board periodically runs a host command as a muted console or a synthetic
//! player, captures everything the command prints, rewrites it through an
//! ordered chain of regex filters, and renders the result onto a view anchored
//! at a world location.
//!
//! This crate provides:
//! - Board refresh state machine with at most one pending output read per board
//! - Registry of boards and their periodic refresh tasks
//! - Output capture through buffered command senders
//! - Durations in ticks (`30s`, `5m`, `1h30m`)
//! - TOML persistence of board definitions
//! - Engine lifecycle and administrative commands
//!
//! The host process is abstracted behind the traits in [`host`]; a
//! deterministic [`TickScheduler`] implements the scheduling side.

pub mod admin;
pub mod board;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod host;
pub mod location;
pub mod messages;
pub mod prelude;
pub mod registry;
pub mod scheduler;
pub mod time;

#[cfg(test)]
mod testing;

pub use admin::AdminCommand;
pub use board::{Board, BoardInfo, BoardSettings, RefreshOutcome, RefreshState};
pub use capture::{
    Actor, BufferedSender, CaptureBuffer, CommandSender, LINE_SEPARATOR, SenderKind,
    SyntheticPlayer,
};
pub use config::{BoardConfig, BoardDefinition, CONFIG_FILE};
pub use engine::Engine;
pub use error::{Error, Result};
pub use filter::{Filter, FilterChain, normalize};
pub use host::{
    ActorProvider, CommandDispatcher, ConsoleOnly, Host, HostBuilder, Scheduler, TaskHandle,
    View, ViewFactory,
};
pub use location::Location;
pub use messages::Messages;
pub use registry::Registry;
pub use scheduler::TickScheduler;
pub use time::{TICKS_PER_SECOND, Ticks, format_ticks, parse_ticks};
