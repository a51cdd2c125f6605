//! In-memory host fakes for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::{Actor, CommandSender, SenderKind, SyntheticPlayer};
use crate::host::{ActorProvider, CommandDispatcher, Host, HostBuilder, View, ViewFactory};
use crate::location::Location;
use crate::scheduler::TickScheduler;

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchCall {
    pub actor: String,
    pub kind: SenderKind,
    pub command: String,
}

/// Dispatcher that answers scripted commands and refuses everything else
#[derive(Default)]
pub struct RecordingDispatcher {
    scripts: Mutex<HashMap<String, Vec<String>>>,
    calls: Mutex<Vec<DispatchCall>>,
    last_sender: Mutex<Option<Arc<dyn CommandSender>>>,
}

impl RecordingDispatcher {
    pub fn script(&self, command: &str, lines: &[&str]) {
        self.scripts.lock().insert(
            command.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.calls.lock().clone()
    }

    pub fn last_sender(&self) -> Option<Arc<dyn CommandSender>> {
        self.last_sender.lock().clone()
    }
}

impl CommandDispatcher for RecordingDispatcher {
    fn dispatch(&self, sender: Arc<dyn CommandSender>, command: &str) -> bool {
        self.calls.lock().push(DispatchCall {
            actor: sender.actor().name().to_string(),
            kind: sender.actor().kind(),
            command: command.to_string(),
        });

        let Some(lines) = self.scripts.lock().get(command).cloned() else {
            return false;
        };
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        sender.send_messages(&lines);
        *self.last_sender.lock() = Some(sender);
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Created,
    Located(Location),
    Updated(String),
    Removed,
}

type EventLog = Arc<Mutex<Vec<(String, ViewEvent)>>>;

/// View backend that records every call
#[derive(Default)]
pub struct RecordingViews {
    log: EventLog,
}

impl RecordingViews {
    pub fn events(&self, id: &str) -> Vec<ViewEvent> {
        self.log
            .lock()
            .iter()
            .filter(|(view, _)| view == id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn update_count(&self, id: &str) -> usize {
        self.events(id)
            .iter()
            .filter(|e| matches!(e, ViewEvent::Updated(_)))
            .count()
    }
}

struct RecordingView {
    id: String,
    log: EventLog,
}

impl RecordingView {
    fn push(&self, event: ViewEvent) {
        self.log.lock().push((self.id.clone(), event));
    }
}

impl View for RecordingView {
    fn set_location(&mut self, location: &Location) {
        self.push(ViewEvent::Located(location.clone()));
    }

    fn update_view(&mut self, text: &str) {
        self.push(ViewEvent::Updated(text.to_string()));
    }

    fn remove_view(&mut self) {
        self.push(ViewEvent::Removed);
    }
}

impl ViewFactory for RecordingViews {
    fn create_view(&self, id: &str) -> Box<dyn View> {
        let view = RecordingView {
            id: id.to_string(),
            log: Arc::clone(&self.log),
        };
        view.push(ViewEvent::Created);
        Box::new(view)
    }
}

/// Console plus synthetic players wherever a world is set
#[derive(Default)]
pub struct TestActors;

impl ActorProvider for TestActors {
    fn console(&self) -> Actor {
        Actor::console("CONSOLE")
    }

    fn synthetic_player(&self, board_id: &str, location: &Location) -> Option<SyntheticPlayer> {
        location.has_world().then(|| SyntheticPlayer {
            name: format!("hgs_{board_id}"),
            location: location.clone(),
        })
    }
}

/// A host wired to recording fakes and a hand-driven scheduler
pub struct TestHost {
    pub host: Host,
    pub scheduler: Arc<TickScheduler>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub views: Arc<RecordingViews>,
}

impl TestHost {
    pub fn new() -> Self {
        let scheduler = Arc::new(TickScheduler::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let views = Arc::new(RecordingViews::default());
        let host = builder(&scheduler, &dispatcher, &views)
            .build()
            .expect("all capabilities provided");

        Self {
            host,
            scheduler,
            dispatcher,
            views,
        }
    }

    /// A fresh builder wired to the same fakes
    pub fn builder(&self) -> HostBuilder {
        builder(&self.scheduler, &self.dispatcher, &self.views)
    }
}

fn builder(
    scheduler: &Arc<TickScheduler>,
    dispatcher: &Arc<RecordingDispatcher>,
    views: &Arc<RecordingViews>,
) -> HostBuilder {
    Host::builder()
        .scheduler(scheduler.clone())
        .dispatcher(dispatcher.clone())
        .views(views.clone())
        .actors(Arc::new(TestActors))
}
