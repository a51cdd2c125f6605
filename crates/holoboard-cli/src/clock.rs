//! Wall clock driver for the tick scheduler.

use std::time::{Duration, Instant};

use holoboard_core::TickScheduler;
use tracing::debug;

use crate::shutdown::ShutdownSignal;

/// Tick `scheduler` every `period` until `shutdown` fires.
///
/// Ticks that fall behind are caught up immediately, so the tick count keeps
/// pace with wall time.
pub fn run(scheduler: &TickScheduler, period: Duration, shutdown: &ShutdownSignal) {
    run_until(scheduler, period, shutdown, || false);
}

/// Like [`run`], but also stops once `done` returns true after a tick.
pub fn run_until(
    scheduler: &TickScheduler,
    period: Duration,
    shutdown: &ShutdownSignal,
    mut done: impl FnMut() -> bool,
) {
    let period = period.max(Duration::from_millis(1));
    let mut next = Instant::now() + period;
    debug!("Clock started, {}ms per tick", period.as_millis());

    loop {
        let now = Instant::now();
        if next > now && shutdown.wait(next - now) {
            break;
        }
        if shutdown.is_shutdown() {
            break;
        }
        scheduler.tick();
        next += period;
        if done() {
            break;
        }
    }
    debug!("Clock stopped at tick {}", scheduler.now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use holoboard_core::Scheduler;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_runs_until_done() {
        let scheduler = TickScheduler::new();
        let shutdown = ShutdownSignal::new();
        run_until(&scheduler, Duration::from_millis(1), &shutdown, || {
            scheduler.now() >= 5
        });
        assert_eq!(scheduler.now(), 5);
    }

    #[test]
    fn test_stops_on_shutdown_from_task() {
        let scheduler = TickScheduler::new();
        let shutdown = Arc::new(ShutdownSignal::new());
        let trigger = Arc::clone(&shutdown);
        scheduler.run_after(3, Box::new(move || trigger.trigger()));

        run(&scheduler, Duration::from_millis(1), &shutdown);
        assert_eq!(scheduler.now(), 3);
    }

    #[test]
    fn test_already_shut_down() {
        let scheduler = TickScheduler::new();
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        let ran = AtomicBool::new(false);
        run_until(&scheduler, Duration::from_millis(1), &shutdown, || {
            ran.store(true, Ordering::SeqCst);
            true
        });
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(scheduler.now(), 0);
    }
}
