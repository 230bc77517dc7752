//! Cooperative cancellation for every suspension point.
//!
//! Both the scheduler's admission delay and a worker's simulated I/O sleep go
//! through [`ShutdownSignal::sleep`], so triggering the signal bounds how long
//! the process takes to stop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct SignalState {
    triggered: Mutex<bool>,
    wakeup: Condvar,
}

/// A cloneable, one-shot shutdown flag that sleepers can wait on.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    state: Arc<SignalState>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal and wakes every sleeper. Idempotent.
    pub fn trigger(&self) {
        let mut triggered = self.state.triggered.lock();
        *triggered = true;
        self.state.wakeup.notify_all();
    }

    /// Whether [`ShutdownSignal::trigger`] has been called.
    pub fn is_triggered(&self) -> bool {
        *self.state.triggered.lock()
    }

    /// Sleeps for `duration` unless the signal fires first.
    ///
    /// Returns [`Error::Interrupted`] if the signal was already set or fires
    /// while sleeping.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        let mut triggered = self.state.triggered.lock();
        loop {
            if *triggered {
                return Err(Error::Interrupted);
            }
            // Spurious wakeups loop back and re-check both conditions
            if self
                .state
                .wakeup
                .wait_until(&mut triggered, deadline)
                .timed_out()
            {
                return if *triggered {
                    Err(Error::Interrupted)
                } else {
                    Ok(())
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_sleep_completes_untriggered() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert_eq!(signal.sleep(Duration::from_millis(20)), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_sleep_after_trigger_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        let start = Instant::now();
        assert_eq!(signal.sleep(Duration::from_secs(60)), Err(Error::Interrupted));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_trigger_wakes_sleeper() {
        let signal = ShutdownSignal::new();
        let sleeper = {
            let signal = signal.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let result = signal.sleep(Duration::from_secs(60));
                (result, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        signal.trigger();
        let (result, elapsed) = sleeper.join().unwrap();
        assert_eq!(result, Err(Error::Interrupted));
        assert!(elapsed < Duration::from_secs(10));
        assert!(signal.is_triggered());
    }
}
