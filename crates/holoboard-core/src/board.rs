//! A single command → display pairing and its refresh cycle.
//!
//! ```text
//!            refresh()                      post-exec delay elapsed
//!   IDLE ──────────────► AWAITING_OUTPUT ─────────────────────────► IDLE
//!     ▲                      │  (read capture, filter, render)
//!     │  dispatch failed /   │
//!     └──────────────────────┘  refresh() again: pending read cancelled,
//!        no actor available      new cycle starts
//! ```
//!
//! Failures never leave the board in a failed state: they are rendered as an
//! error line and the board returns to idle.

use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::capture::{BufferedSender, SenderKind};
use crate::filter::FilterChain;
use crate::host::{Host, TaskHandle, View};
use crate::location::Location;
use crate::time::{self, Ticks, format_ticks};

/// Default time between refreshes
pub const DEFAULT_INTERVAL: Ticks = time::minutes(30);

/// Default time between dispatch and reading the output
pub const DEFAULT_DELAY: Ticks = time::seconds(5);

/// Everything an administrator can change about a board
#[derive(Debug, Clone)]
pub struct BoardSettings {
    pub command: String,
    pub location: Location,
    pub interval: Ticks,
    pub delay: Ticks,
    pub sender: SenderKind,
    pub filters: FilterChain,
}

impl BoardSettings {
    pub fn new(command: impl Into<String>, location: Location) -> Self {
        Self {
            command: command.into(),
            location,
            interval: DEFAULT_INTERVAL,
            delay: DEFAULT_DELAY,
            sender: SenderKind::default(),
            filters: FilterChain::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    AwaitingOutput,
}

/// What a call to [`Board::refresh`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Command dispatched, output read scheduled
    Scheduled,
    /// Dispatcher refused the command; error rendered
    DispatchFailed,
    /// No actor could be created; error rendered
    CaptureUnavailable,
    /// Board was already torn down; nothing happened
    Removed,
}

/// Read-only snapshot for listings
#[derive(Debug, Clone)]
pub struct BoardInfo {
    pub id: String,
    pub command: String,
    pub location: Location,
    pub interval: String,
    pub delay: String,
    pub sender: SenderKind,
    pub filters: Vec<String>,
    pub state: RefreshState,
    pub last_output: Option<String>,
    pub last_refreshed: Option<DateTime<Local>>,
}

struct PendingRead {
    generation: u64,
    handle: TaskHandle,
}

#[derive(Default)]
struct RenderState {
    view: Option<Box<dyn View>>,
    pending: Option<PendingRead>,
    generation: u64,
    last_output: Option<String>,
    last_refreshed: Option<DateTime<Local>>,
    removed: bool,
}

/// A configured board.
///
/// Settings and render state sit behind separate locks and are never held at
/// the same time.
pub struct Board {
    id: String,
    settings: RwLock<BoardSettings>,
    render: Mutex<RenderState>,
}

impl Board {
    pub fn new(id: impl Into<String>, settings: BoardSettings) -> Self {
        Self {
            id: id.into(),
            settings: RwLock::new(settings),
            render: Mutex::new(RenderState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> BoardSettings {
        self.settings.read().clone()
    }

    pub fn command(&self) -> String {
        self.settings.read().command.clone()
    }

    pub fn set_command(&self, command: impl Into<String>) {
        self.settings.write().command = command.into();
    }

    pub fn location(&self) -> Location {
        self.settings.read().location.clone()
    }

    /// Move the board, repositioning a live view.
    pub fn set_location(&self, location: Location) {
        self.settings.write().location = location.clone();
        if let Some(view) = self.render.lock().view.as_mut() {
            view.set_location(&location);
        }
    }

    pub fn interval(&self) -> Ticks {
        self.settings.read().interval
    }

    /// Takes effect the next time the board is scheduled; see
    /// [`crate::Registry::set_interval`].
    pub fn set_interval(&self, interval: Ticks) {
        self.settings.write().interval = interval;
    }

    pub fn delay(&self) -> Ticks {
        self.settings.read().delay
    }

    pub fn set_delay(&self, delay: Ticks) {
        self.settings.write().delay = delay;
    }

    pub fn sender(&self) -> SenderKind {
        self.settings.read().sender
    }

    pub fn set_sender(&self, sender: SenderKind) {
        self.settings.write().sender = sender;
    }

    pub fn filters(&self) -> FilterChain {
        self.settings.read().filters.clone()
    }

    pub fn set_filters(&self, filters: FilterChain) {
        self.settings.write().filters = filters;
    }

    pub fn last_output(&self) -> Option<String> {
        self.render.lock().last_output.clone()
    }

    pub fn state(&self) -> RefreshState {
        if self.render.lock().pending.is_some() {
            RefreshState::AwaitingOutput
        } else {
            RefreshState::Idle
        }
    }

    /// Handle of the outstanding output read, if any
    pub fn pending_task(&self) -> Option<TaskHandle> {
        self.render.lock().pending.as_ref().map(|p| p.handle.clone())
    }

    pub fn has_view(&self) -> bool {
        self.render.lock().view.is_some()
    }

    pub fn is_removed(&self) -> bool {
        self.render.lock().removed
    }

    pub fn info(&self) -> BoardInfo {
        let settings = self.settings();
        let render = self.render.lock();
        BoardInfo {
            id: self.id.clone(),
            command: settings.command,
            location: settings.location,
            interval: format_ticks(settings.interval),
            delay: format_ticks(settings.delay),
            sender: settings.sender,
            filters: settings.filters.definitions(),
            state: if render.pending.is_some() {
                RefreshState::AwaitingOutput
            } else {
                RefreshState::Idle
            },
            last_output: render.last_output.clone(),
            last_refreshed: render.last_refreshed,
        }
    }

    /// Run one refresh cycle.
    ///
    /// Any outstanding output read is cancelled first, so at most one read is
    /// pending per board.
    pub fn refresh(self: &Arc<Self>, host: &Host) -> RefreshOutcome {
        if self.is_removed() {
            return RefreshOutcome::Removed;
        }
        self.cancel_pending();

        let settings = self.settings();
        let Some(sender) =
            BufferedSender::create(settings.sender, &self.id, &settings.location, host.actors())
        else {
            warn!("Board {}: no {} actor available", self.id, settings.sender);
            self.render(host, host.messages().capture_unavailable(&settings.command));
            return RefreshOutcome::CaptureUnavailable;
        };
        let sender = Arc::new(sender);

        if !host.dispatcher().dispatch(sender.clone(), &settings.command) {
            warn!(
                "Board {}: unable to execute '{}'",
                self.id, settings.command
            );
            self.render(host, host.messages().unable_to_execute(&settings.command));
            return RefreshOutcome::DispatchFailed;
        }

        let mut render = self.render.lock();
        if render.removed {
            return RefreshOutcome::Removed;
        }
        render.generation += 1;
        let generation = render.generation;

        let board = Arc::clone(self);
        let task_host = host.clone();
        let handle = host.scheduler().run_after_async(
            settings.delay,
            Box::new(move || {
                let output = sender.captured();
                board.complete_refresh(&task_host, generation, &output);
            }),
        );
        debug!(
            "Board {}: dispatched '{}', reading output in {}",
            self.id,
            settings.command,
            format_ticks(settings.delay)
        );
        // A concurrent refresh may have installed its read since we cancelled
        if let Some(old) = render.pending.replace(PendingRead { generation, handle }) {
            old.handle.cancel();
        }
        RefreshOutcome::Scheduled
    }

    fn complete_refresh(&self, host: &Host, generation: u64, output: &str) {
        let filtered = self.filters().apply(output);
        let location = self.location();

        let mut render = self.render.lock();
        if render.removed {
            return;
        }
        if render.pending.as_ref().map(|p| p.generation) == Some(generation) {
            render.pending = None;
        }
        self.render_locked(&mut render, host, &location, filtered);
    }

    /// Render text outside of a regular cycle, e.g. an error message.
    pub fn render(&self, host: &Host, text: String) {
        let location = self.location();
        let mut render = self.render.lock();
        if render.removed {
            return;
        }
        self.render_locked(&mut render, host, &location, text);
    }

    fn render_locked(
        &self,
        render: &mut RenderState,
        host: &Host,
        location: &Location,
        text: String,
    ) {
        let view = render.view.get_or_insert_with(|| {
            debug!("Board {}: creating view at {}", self.id, location);
            let mut view = host.views().create_view(&self.id);
            view.set_location(location);
            view
        });
        view.update_view(&text);
        render.last_output = Some(text);
        render.last_refreshed = Some(Local::now());
    }

    fn cancel_pending(&self) {
        if let Some(pending) = self.render.lock().pending.take() {
            pending.handle.cancel();
        }
    }

    /// Tear down the view and any pending read. The board renders nothing
    /// afterwards.
    pub fn remove_view(&self) {
        let mut render = self.render.lock();
        render.removed = true;
        if let Some(pending) = render.pending.take() {
            pending.handle.cancel();
        }
        if let Some(mut view) = render.view.take() {
            view.remove_view();
        }
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("id", &self.id)
            .field("settings", &*self.settings.read())
            .field("state", &self.state())
            .finish()
    }
}
