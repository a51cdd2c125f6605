//! The set of known boards and their periodic refresh tasks.
//!
//! Boards are keyed by id. A periodic task exists for an id only while that
//! board is registered and has been scheduled; scheduling again replaces the
//! previous task. Iteration always works on a snapshot, so boards can be added
//! or removed from inside a refresh callback.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::board::{Board, BoardSettings, RefreshOutcome};
use crate::config::BoardDefinition;
use crate::error::{Error, Result};
use crate::host::{Host, TaskHandle};
use crate::time::{Ticks, format_ticks};

pub struct Registry {
    host: Host,
    boards: RwLock<BTreeMap<String, Arc<Board>>>,
    tasks: Mutex<HashMap<String, TaskHandle>>,
}

impl Registry {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            boards: RwLock::new(BTreeMap::new()),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Replace every board with `definitions` and schedule them all.
    pub fn load(self: &Arc<Self>, definitions: &BTreeMap<String, BoardDefinition>) -> usize {
        self.remove_all();

        for (id, definition) in definitions {
            let board = Arc::new(definition.to_board(id));
            if let Err(e) = self.add(Arc::clone(&board)) {
                debug!("Skipping board {}: {}", id, e);
            }
        }

        let boards = self.boards();
        for board in &boards {
            self.schedule_updater(board);
        }
        info!("Loaded {} boards", boards.len());
        boards.len()
    }

    /// Insert a board without scheduling it.
    pub fn add(&self, board: Arc<Board>) -> Result<()> {
        let mut boards = self.boards.write();
        if boards.contains_key(board.id()) {
            return Err(Error::DuplicateBoard(board.id().to_string()));
        }
        boards.insert(board.id().to_string(), board);
        Ok(())
    }

    /// Insert a new board and start refreshing it.
    pub fn create(
        self: &Arc<Self>,
        id: impl Into<String>,
        settings: BoardSettings,
    ) -> Result<Arc<Board>> {
        let board = Arc::new(Board::new(id, settings));
        self.add(Arc::clone(&board))?;
        self.schedule_updater(&board);
        info!("Created board {}", board.id());
        Ok(board)
    }

    /// Cancel the board's periodic task, tear down its view and pending read,
    /// and drop it from the set. Returns whether it was registered.
    pub fn remove(&self, board: &Board) -> bool {
        if let Some(task) = self.tasks.lock().remove(board.id()) {
            task.cancel();
        }
        board.remove_view();
        let removed = self.boards.write().remove(board.id()).is_some();
        if removed {
            debug!("Removed board {}", board.id());
        }
        removed
    }

    pub fn remove_by_id(&self, id: &str) -> bool {
        match self.get(id) {
            Some(board) => self.remove(&board),
            None => false,
        }
    }

    /// Remove every board. Returns how many were removed.
    pub fn remove_all(&self) -> usize {
        self.boards()
            .iter()
            .filter(|board| self.remove(board))
            .count()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Board>> {
        self.boards.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.boards.read().contains_key(id)
    }

    /// Snapshot of all boards, ordered by id
    pub fn boards(&self) -> Vec<Arc<Board>> {
        self.boards.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.boards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.read().is_empty()
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.tasks
            .lock()
            .get(id)
            .is_some_and(|task| !task.is_cancelled())
    }

    /// Refresh `board` every `board.interval()` ticks, starting next tick.
    ///
    /// The task looks the board up by id on every run and cancels itself once
    /// the id is gone.
    pub fn schedule_updater(self: &Arc<Self>, board: &Board) {
        let id = board.id().to_string();
        let period = board.interval();
        let registry: Weak<Self> = Arc::downgrade(self);
        let task_id = id.clone();

        let handle = self.host.scheduler().run_periodic(
            period,
            Box::new(move |handle| {
                let Some(registry) = registry.upgrade() else {
                    handle.cancel();
                    return;
                };
                match registry.get(&task_id) {
                    Some(board) => {
                        board.refresh(&registry.host);
                    }
                    None => {
                        debug!("Board {} is gone, cancelling its updater", task_id);
                        handle.cancel();
                        registry.forget_task(&task_id, handle);
                    }
                }
            }),
        );

        debug!("Scheduled board {} every {}", id, format_ticks(period));
        if let Some(previous) = self.tasks.lock().insert(id, handle) {
            previous.cancel();
        }
    }

    fn forget_task(&self, id: &str, handle: &TaskHandle) {
        let mut tasks = self.tasks.lock();
        if tasks.get(id).is_some_and(|t| t.id() == handle.id()) {
            tasks.remove(id);
        }
    }

    /// Change a board's interval and reschedule it.
    pub fn set_interval(self: &Arc<Self>, id: &str, interval: Ticks) -> Result<()> {
        let board = self
            .get(id)
            .ok_or_else(|| Error::BoardNotFound(id.to_string()))?;
        board.set_interval(interval);
        self.schedule_updater(&board);
        Ok(())
    }

    /// Refresh every board right now, independent of its timer.
    pub fn refresh_all(&self) -> Vec<(String, RefreshOutcome)> {
        self.boards()
            .iter()
            .map(|board| (board.id().to_string(), board.refresh(&self.host)))
            .collect()
    }

    /// Current boards as persistable definitions
    pub fn definitions(&self) -> BTreeMap<String, BoardDefinition> {
        self.boards()
            .iter()
            .map(|board| (board.id().to_string(), BoardDefinition::from_board(board)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{DEFAULT_DELAY, RefreshState};
    use crate::location::Location;
    use crate::testing::{TestHost, ViewEvent};

    fn settings(command: &str, interval: Ticks) -> BoardSettings {
        BoardSettings {
            interval,
            ..BoardSettings::new(command, Location::new("world", 0.0, 64.0, 0.0))
        }
    }

    fn registry(test: &TestHost) -> Arc<Registry> {
        Arc::new(Registry::new(test.host.clone()))
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let test = TestHost::new();
        let registry = registry(&test);
        registry
            .add(Arc::new(Board::new("top", settings("/list", 200))))
            .unwrap();
        let err = registry
            .add(Arc::new(Board::new("top", settings("/tps", 200))))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateBoard(id) if id == "top"));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_scheduled("top"));
    }

    #[test]
    fn test_scheduled_board_refreshes_every_interval() {
        let test = TestHost::new();
        test.dispatcher.script("/list", &["x"]);
        let registry = registry(&test);
        registry.create("top", settings("/list", 200)).unwrap();

        test.scheduler.tick();
        assert_eq!(test.dispatcher.calls().len(), 1);
        test.scheduler.advance(199);
        assert_eq!(test.dispatcher.calls().len(), 1);
        test.scheduler.tick();
        assert_eq!(test.dispatcher.calls().len(), 2);
    }

    #[test]
    fn test_rescheduling_replaces_previous_task() {
        let test = TestHost::new();
        test.dispatcher.script("/list", &["x"]);
        let registry = registry(&test);
        let board = registry.create("top", settings("/list", 200)).unwrap();

        registry.schedule_updater(&board);
        registry.schedule_updater(&board);
        test.scheduler.tick();

        assert_eq!(test.dispatcher.calls().len(), 1);
        assert!(registry.is_scheduled("top"));
    }

    #[test]
    fn test_remove_cancels_task_and_view() {
        let test = TestHost::new();
        test.dispatcher.script("/list", &["x"]);
        let registry = registry(&test);
        let board = registry.create("top", settings("/list", 200)).unwrap();
        test.scheduler.advance(1 + DEFAULT_DELAY);
        assert!(board.has_view());

        assert!(registry.remove(&board));
        assert!(!registry.contains("top"));
        assert!(!registry.is_scheduled("top"));
        assert_eq!(test.views.events("top").last(), Some(&ViewEvent::Removed));

        let updates = test.views.update_count("top");
        test.scheduler.advance(1000);
        assert_eq!(test.views.update_count("top"), updates);
        assert_eq!(test.dispatcher.calls().len(), 1);
        assert_eq!(test.scheduler.pending(), 0);

        assert!(!registry.remove(&board));
    }

    #[test]
    fn test_stale_periodic_task_cancels_itself() {
        let test = TestHost::new();
        test.dispatcher.script("/list", &["x"]);
        let registry = registry(&test);
        let board = Arc::new(Board::new("top", settings("/list", 5)));
        registry.add(Arc::clone(&board)).unwrap();
        registry.schedule_updater(&board);

        // Drop the board behind the registry's back; the task must notice
        registry.boards.write().remove("top");
        test.scheduler.advance(20);

        assert!(test.dispatcher.calls().is_empty());
        assert!(!registry.is_scheduled("top"));
        assert_eq!(test.scheduler.pending(), 0);
    }

    #[test]
    fn test_refresh_all_runs_each_board_independently() {
        let test = TestHost::new();
        test.dispatcher.script("/a", &["A"]);
        test.dispatcher.script("/b", &["B"]);
        let registry = registry(&test);
        for (id, command) in [("a", "/a"), ("b", "/b"), ("c", "/missing")] {
            registry
                .add(Arc::new(Board::new(id, settings(command, 200))))
                .unwrap();
        }

        let outcomes = registry.refresh_all();
        assert_eq!(
            outcomes,
            vec![
                ("a".to_string(), RefreshOutcome::Scheduled),
                ("b".to_string(), RefreshOutcome::Scheduled),
                ("c".to_string(), RefreshOutcome::DispatchFailed),
            ]
        );
        assert_eq!(test.scheduler.pending(), 2);

        test.scheduler.advance(DEFAULT_DELAY);
        let a = registry.get("a").unwrap();
        let b = registry.get("b").unwrap();
        assert_eq!(a.state(), RefreshState::Idle);
        assert!(a.last_output().unwrap().starts_with('A'));
        assert!(b.last_output().unwrap().starts_with('B'));
        assert!(registry.get("c").unwrap().last_output().unwrap().contains("/missing"));
    }

    #[test]
    fn test_load_replaces_existing_boards() {
        let test = TestHost::new();
        test.dispatcher.script("/old", &["x"]);
        let registry = registry(&test);
        let old = registry.create("old", settings("/old", 200)).unwrap();
        test.scheduler.advance(1 + DEFAULT_DELAY);

        let mut definitions = BTreeMap::new();
        definitions.insert(
            "new".to_string(),
            BoardDefinition::new("/new", Location::new("world", 0.0, 0.0, 0.0)),
        );
        assert_eq!(registry.load(&definitions), 1);

        assert!(old.is_removed());
        assert!(!registry.contains("old"));
        assert!(registry.is_scheduled("new"));
        assert!(!registry.is_scheduled("old"));
        assert_eq!(test.views.events("old").last(), Some(&ViewEvent::Removed));
    }

    #[test]
    fn test_set_interval_reschedules() {
        let test = TestHost::new();
        test.dispatcher.script("/list", &["x"]);
        let registry = registry(&test);
        registry.create("top", settings("/list", 1000)).unwrap();
        test.scheduler.tick();

        registry.set_interval("top", 10).unwrap();
        test.scheduler.advance(11);
        assert_eq!(test.dispatcher.calls().len(), 3);

        assert!(matches!(
            registry.set_interval("nope", 10),
            Err(Error::BoardNotFound(_))
        ));
    }

    #[test]
    fn test_remove_all_from_inside_refresh_is_safe() {
        let test = TestHost::new();
        test.dispatcher.script("/list", &["x"]);
        let registry = registry(&test);
        registry.create("a", settings("/list", 5)).unwrap();
        registry.create("b", settings("/list", 5)).unwrap();

        let inner = Arc::clone(&registry);
        test.host.scheduler().run_after(
            3,
            Box::new(move || {
                inner.remove_all();
            }),
        );
        test.scheduler.advance(50);

        assert!(registry.is_empty());
        assert_eq!(test.scheduler.pending(), 0);
    }

    #[test]
    fn test_definitions_snapshot() {
        let test = TestHost::new();
        let registry = registry(&test);
        registry
            .add(Arc::new(Board::new("top", settings("/list", 1200))))
            .unwrap();

        let definitions = registry.definitions();
        assert_eq!(definitions["top"].command, "/list");
        assert_eq!(definitions["top"].interval, "1m");
    }
}
