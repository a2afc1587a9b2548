//! Tick pacing for the mod host.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Stop request shared between the host loop and whoever wants it to end
/// (the CLI's Ctrl+C handler, or a mod).
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake a host sleeping between ticks.
    pub fn trigger(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.wake.notify_all();
    }

    /// Sleep until `deadline`. Returns `true` as soon as a stop is requested.
    fn sleep_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            stopped = self
                .wake
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

/// Fixed-rate schedule: tick `n` is due at `start + n * interval`, so time
/// spent inside hooks does not stretch the period. A tick that is already
/// late runs immediately and the schedule restarts from now, without
/// bursting to catch up.
#[derive(Debug)]
pub(crate) struct TickPacer {
    interval: Duration,
    next: Instant,
}

impl TickPacer {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }

    /// Wait for the next tick. Returns `false` when `shutdown` fired instead.
    pub(crate) fn wait(&mut self, shutdown: &ShutdownSignal) -> bool {
        if shutdown.sleep_until(self.next) {
            return false;
        }
        let now = Instant::now();
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_pacer_ticks_on_schedule() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        let mut pacer = TickPacer::new(Duration::from_millis(20));

        assert!(pacer.wait(&signal));
        assert!(pacer.wait(&signal));
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_late_pacer_does_not_burst() {
        let signal = ShutdownSignal::new();
        let mut pacer = TickPacer::new(Duration::from_millis(20));
        thread::sleep(Duration::from_millis(100));

        // Overdue tick fires at once, the following one waits a full period.
        assert!(pacer.wait(&signal));
        let start = Instant::now();
        assert!(pacer.wait(&signal));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_triggered_signal_stops_pacer() {
        let signal = ShutdownSignal::new();
        let mut pacer = TickPacer::new(Duration::from_secs(30));
        signal.trigger();

        let start = Instant::now();
        assert!(!pacer.wait(&signal));
        assert!(start.elapsed() < Duration::from_secs(1));
        // Stays stopped.
        assert!(!pacer.wait(&signal));
    }
}
