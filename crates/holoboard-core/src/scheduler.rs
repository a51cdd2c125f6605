//! Cooperative tick scheduler.
//!
//! Nothing runs until the owner calls [`TickScheduler::tick`]. Each tick
//! advances the clock by one and runs every task that became due, in due
//! order. A host drives it from its main loop; tests drive it by hand with
//! [`TickScheduler::advance`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::host::{RepeatingTask, Scheduler, Task, TaskHandle};
use crate::time::Ticks;

enum Work {
    Once { task: Task, asynchronous: bool },
    Periodic { task: RepeatingTask, period: Ticks },
}

struct Entry {
    handle: TaskHandle,
    due: Ticks,
    work: Work,
}

#[derive(Default)]
struct Queue {
    now: Ticks,
    entries: Vec<Entry>,
}

/// Scheduler driven by explicit ticks
#[derive(Default)]
pub struct TickScheduler {
    queue: Mutex<Queue>,
    next_id: AtomicU64,
    offload_async: bool,
}

impl TickScheduler {
    /// Create a scheduler that runs every task on the ticking thread
    pub fn new() -> Self {
        Self::default()
    }

    /// Run tasks scheduled with `run_after_async` on a worker thread.
    pub fn with_async_offload(mut self) -> Self {
        self.offload_async = true;
        self
    }

    /// Current tick
    pub fn now(&self) -> Ticks {
        self.queue.lock().now
    }

    /// Number of scheduled tasks that are not cancelled
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .entries
            .iter()
            .filter(|e| !e.handle.is_cancelled())
            .count()
    }

    /// Advance one tick and run everything that became due.
    pub fn tick(&self) {
        let due = {
            let mut queue = self.queue.lock();
            queue.now += 1;
            let now = queue.now;
            queue.entries.retain(|e| !e.handle.is_cancelled());

            let (mut due, waiting): (Vec<Entry>, Vec<Entry>) =
                queue.entries.drain(..).partition(|e| e.due <= now);
            queue.entries = waiting;
            due.sort_by_key(|e| (e.due, e.handle.id()));
            due
        };

        for entry in due {
            self.run(entry);
        }
    }

    /// Run `ticks` ticks
    pub fn advance(&self, ticks: Ticks) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    fn run(&self, entry: Entry) {
        // Cancelled by an earlier task of this same tick
        if entry.handle.is_cancelled() {
            return;
        }

        let Entry { handle, work, .. } = entry;
        match work {
            Work::Once { task, asynchronous } if asynchronous && self.offload_async => {
                let id = handle.id();
                thread::spawn(move || guarded(id, task));
            }
            Work::Once { task, .. } => guarded(handle.id(), task),
            Work::Periodic { mut task, period } => {
                let id = handle.id();
                guarded(id, || task(&handle));
                if handle.is_cancelled() {
                    debug!("Periodic task {} cancelled itself", id);
                    return;
                }
                let mut queue = self.queue.lock();
                let due = queue.now + period;
                queue.entries.push(Entry {
                    handle,
                    due,
                    work: Work::Periodic { task, period },
                });
            }
        }
    }

    fn push(&self, due_in: Ticks, work: Work) -> TaskHandle {
        let handle = TaskHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut queue = self.queue.lock();
        let due = queue.now + due_in;
        queue.entries.push(Entry {
            handle: handle.clone(),
            due,
            work,
        });
        handle
    }
}

/// A panicking task must not take the tick loop down with it.
fn guarded(id: u64, task: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        error!("Scheduled task {} panicked", id);
    }
}

impl Scheduler for TickScheduler {
    fn run_after(&self, delay: Ticks, task: Task) -> TaskHandle {
        self.push(
            delay,
            Work::Once {
                task,
                asynchronous: false,
            },
        )
    }

    fn run_after_async(&self, delay: Ticks, task: Task) -> TaskHandle {
        self.push(
            delay,
            Work::Once {
                task,
                asynchronous: true,
            },
        )
    }

    fn run_periodic(&self, period: Ticks, task: RepeatingTask) -> TaskHandle {
        self.push(
            0,
            Work::Periodic {
                task,
                period: period.max(1),
            },
        )
    }
}
