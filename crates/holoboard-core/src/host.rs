//! Host collaborators.
//!
//! The engine never talks to a concrete server. Everything it needs from the
//! host process comes through the traits in this module, bundled into a
//! [`Host`] by [`HostBuilder`]:
//!
//! - [`Scheduler`]: run-once-after-delay and run-periodically, in ticks
//! - [`CommandDispatcher`]: execute a command as a given [`CommandSender`]
//! - [`ViewFactory`] / [`View`]: the floating multi-line display backend
//! - [`ActorProvider`]: console identity and synthetic players
//!
//! The dispatcher and the view backend are required capabilities. Building a
//! host without either fails with [`Error::MissingCapability`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::{Actor, CommandSender, SyntheticPlayer};
use crate::error::{Error, Result};
use crate::location::Location;
use crate::messages::Messages;
use crate::time::Ticks;

/// One-shot scheduled work
pub type Task = Box<dyn FnOnce() + Send>;

/// Periodic scheduled work; receives its own handle so it can cancel itself
pub type RepeatingTask = Box<dyn FnMut(&TaskHandle) + Send>;

/// Cancellation token for a scheduled task.
///
/// Cancelling is best effort: a task that already started runs to completion.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Tick based task runner.
///
/// Implementations must never run a task from inside `run_after` or
/// `run_periodic` themselves; callers may hold locks while scheduling.
pub trait Scheduler: Send + Sync {
    fn run_after(&self, delay: Ticks, task: Task) -> TaskHandle;

    /// Like [`Scheduler::run_after`], but the task may run off the main tick thread.
    fn run_after_async(&self, delay: Ticks, task: Task) -> TaskHandle {
        self.run_after(delay, task)
    }

    /// Run `task` on the next tick and then every `period` ticks.
    fn run_periodic(&self, period: Ticks, task: RepeatingTask) -> TaskHandle;

    fn cancel(&self, handle: &TaskHandle) {
        handle.cancel();
    }
}

/// The host's command execution entry point
pub trait CommandDispatcher: Send + Sync {
    /// Execute `command` as `sender`. Returns `false` when the command is
    /// unknown or could not be executed.
    ///
    /// The dispatcher may keep `sender` and keep sending output to it after
    /// returning.
    fn dispatch(&self, sender: Arc<dyn CommandSender>, command: &str) -> bool;
}

/// A floating multi-line display owned by one board
pub trait View: Send {
    fn set_location(&mut self, location: &Location);

    fn update_view(&mut self, text: &str);

    fn remove_view(&mut self);
}

/// Rendering backend
pub trait ViewFactory: Send + Sync {
    fn create_view(&self, id: &str) -> Box<dyn View>;
}

/// Source of the identities commands run as
pub trait ActorProvider: Send + Sync {
    fn console(&self) -> Actor;

    /// A transient, non-visible player at `location`, or `None` if the host
    /// cannot place one there.
    fn synthetic_player(&self, board_id: &str, location: &Location) -> Option<SyntheticPlayer>;
}

/// Actor provider for hosts without synthetic player support
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOnly;

impl ActorProvider for ConsoleOnly {
    fn console(&self) -> Actor {
        Actor::console("CONSOLE")
    }

    fn synthetic_player(&self, _board_id: &str, _location: &Location) -> Option<SyntheticPlayer> {
        None
    }
}

/// Confirmed set of host capabilities
#[derive(Clone)]
pub struct Host {
    scheduler: Arc<dyn Scheduler>,
    dispatcher: Arc<dyn CommandDispatcher>,
    views: Arc<dyn ViewFactory>,
    actors: Arc<dyn ActorProvider>,
    messages: Arc<Messages>,
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    pub fn dispatcher(&self) -> &dyn CommandDispatcher {
        self.dispatcher.as_ref()
    }

    pub fn views(&self) -> &dyn ViewFactory {
        self.views.as_ref()
    }

    pub fn actors(&self) -> &dyn ActorProvider {
        self.actors.as_ref()
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }
}

/// Builder for [`Host`]
#[derive(Default)]
pub struct HostBuilder {
    scheduler: Option<Arc<dyn Scheduler>>,
    dispatcher: Option<Arc<dyn CommandDispatcher>>,
    views: Option<Arc<dyn ViewFactory>>,
    actors: Option<Arc<dyn ActorProvider>>,
    messages: Option<Messages>,
}

impl HostBuilder {
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn CommandDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn views(mut self, views: Arc<dyn ViewFactory>) -> Self {
        self.views = Some(views);
        self
    }

    pub fn actors(mut self, actors: Arc<dyn ActorProvider>) -> Self {
        self.actors = Some(actors);
        self
    }

    pub fn messages(mut self, messages: Messages) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Confirm every required capability is present.
    pub fn build(self) -> Result<Host> {
        let scheduler = self.scheduler.ok_or(Error::MissingCapability("scheduler"))?;
        let dispatcher = self
            .dispatcher
            .ok_or(Error::MissingCapability("command interception"))?;
        let views = self
            .views
            .ok_or(Error::MissingCapability("rendering backend"))?;

        Ok(Host {
            scheduler,
            dispatcher,
            views,
            actors: self.actors.unwrap_or_else(|| Arc::new(ConsoleOnly)),
            messages: Arc::new(self.messages.unwrap_or_default()),
        })
    }
}
