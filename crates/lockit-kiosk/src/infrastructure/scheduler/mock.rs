//! Manual refresh scheduler for unit testing.
//!
//! An armed [`ManualScheduler`] fires as soon as it is awaited, so tests step
//! the sampling loop one tick at a time without real timers.  Clones share
//! state, letting a test keep a handle after boxing the scheduler into the
//! controller.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::application::scan_frames::RefreshScheduler;

#[derive(Debug, Default)]
struct SchedulerLog {
    armed: bool,
    schedules: usize,
    cancels: usize,
    fired: usize,
}

/// A [`RefreshScheduler`] driven by the test.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    log: Arc<Mutex<SchedulerLog>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while a tick is pending.
    pub fn is_armed(&self) -> bool {
        self.log.lock().expect("lock poisoned").armed
    }

    /// Number of `schedule` calls.
    pub fn schedule_calls(&self) -> usize {
        self.log.lock().expect("lock poisoned").schedules
    }

    /// Number of `cancel` calls.
    pub fn cancel_calls(&self) -> usize {
        self.log.lock().expect("lock poisoned").cancels
    }

    /// Number of ticks that fired.
    pub fn fired_count(&self) -> usize {
        self.log.lock().expect("lock poisoned").fired
    }
}

#[async_trait]
impl RefreshScheduler for ManualScheduler {
    fn schedule(&mut self) {
        let mut log = self.log.lock().expect("lock poisoned");
        log.schedules += 1;
        log.armed = true;
    }

    fn cancel(&mut self) {
        let mut log = self.log.lock().expect("lock poisoned");
        log.cancels += 1;
        log.armed = false;
    }

    fn is_armed(&self) -> bool {
        ManualScheduler::is_armed(self)
    }

    async fn fired(&mut self) {
        let fired_now = {
            let mut log = self.log.lock().expect("lock poisoned");
            let armed = log.armed;
            if armed {
                log.armed = false;
                log.fired += 1;
            }
            armed
        };
        if !fired_now {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_armed_manual_scheduler_fires_immediately() {
        let mut scheduler = ManualScheduler::new();
        let observer = scheduler.clone();
        scheduler.schedule();

        scheduler.fired().await;

        assert_eq!(observer.fired_count(), 1);
        assert!(!observer.is_armed());
    }

    #[test]
    fn test_disarmed_manual_scheduler_stays_pending() {
        let mut scheduler = ManualScheduler::new();
        let observer = scheduler.clone();

        let mut fired = tokio_test::task::spawn(scheduler.fired());
        tokio_test::assert_pending!(fired.poll());
        drop(fired);

        assert_eq!(observer.fired_count(), 0);
    }
}
