//! Output capture for dispatched commands.
//!
//! A command never talks to a real console or player while a board refreshes.
//! Instead it is handed a [`BufferedSender`], whose message calls land in a
//! shared [`CaptureBuffer`] that the board reads once the post-execution delay
//! has passed.
//!
//! Two sender variants exist, selected by [`SenderKind`]:
//!
//! - **Console**: the console identity, muted.
//! - **Player**: a transient [`SyntheticPlayer`] standing at the board's
//!   location, created per refresh and dropped afterwards.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::host::ActorProvider;
use crate::location::Location;

/// Separator appended after every captured message
pub const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Which identity a board runs its command as
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum SenderKind {
    Player,
    #[default]
    Console,
}

/// A non-visible stand-in player used to run location sensitive commands
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticPlayer {
    pub name: String,
    pub location: Location,
}

/// The identity a command is dispatched as
#[derive(Debug, Clone, PartialEq)]
pub enum Actor {
    Console { name: String },
    Player(SyntheticPlayer),
}

impl Actor {
    pub fn console(name: impl Into<String>) -> Self {
        Self::Console { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Console { name } => name,
            Self::Player(player) => &player.name,
        }
    }

    pub fn kind(&self) -> SenderKind {
        match self {
            Self::Console { .. } => SenderKind::Console,
            Self::Player(_) => SenderKind::Player,
        }
    }

    /// Where the actor stands, if it has a position
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Console { .. } => None,
            Self::Player(player) => Some(&player.location),
        }
    }
}

/// Recipient handed to the command dispatcher.
///
/// Dispatchers route everything the command prints through these calls.
pub trait CommandSender: Send + Sync {
    fn actor(&self) -> &Actor;

    fn send_message(&self, message: &str);

    fn send_messages(&self, messages: &[&str]) {
        for message in messages {
            self.send_message(message);
        }
    }
}

/// Accumulated text of one command execution
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    text: Mutex<String>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, message: &str) {
        let mut text = self.text.lock();
        text.push_str(message);
        text.push_str(LINE_SEPARATOR);
    }

    /// Everything recorded so far, each message followed by [`LINE_SEPARATOR`]
    pub fn captured(&self) -> String {
        self.text.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.text.lock().is_empty()
    }
}

/// A sender that records instead of delivering.
#[derive(Debug)]
pub struct BufferedSender {
    actor: Actor,
    buffer: Arc<CaptureBuffer>,
}

impl BufferedSender {
    /// Wrap the console identity
    pub fn console(console: Actor) -> Self {
        Self {
            actor: console,
            buffer: Arc::new(CaptureBuffer::new()),
        }
    }

    /// Wrap a synthetic player
    pub fn player(player: SyntheticPlayer) -> Self {
        Self {
            actor: Actor::Player(player),
            buffer: Arc::new(CaptureBuffer::new()),
        }
    }

    /// Build the sender variant for `kind`.
    ///
    /// Returns `None` when no synthetic player can be obtained for `location`.
    pub fn create(
        kind: SenderKind,
        board_id: &str,
        location: &Location,
        actors: &dyn ActorProvider,
    ) -> Option<Self> {
        match kind {
            SenderKind::Console => Some(Self::console(actors.console())),
            SenderKind::Player => actors
                .synthetic_player(board_id, location)
                .map(Self::player),
        }
    }

    pub fn captured(&self) -> String {
        self.buffer.captured()
    }

    pub fn buffer(&self) -> Arc<CaptureBuffer> {
        Arc::clone(&self.buffer)
    }
}

impl CommandSender for BufferedSender {
    fn actor(&self) -> &Actor {
        &self.actor
    }

    fn send_message(&self, message: &str) {
        self.buffer.record(message);
    }
}
