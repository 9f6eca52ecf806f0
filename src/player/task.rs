use std::{future::Future, ops::ControlFlow, time::Duration};

use parking_lot::Mutex;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::trace;

/// A named, cancellable timer loop. Starting it again cancels the previous
/// instance first, so at most one is ever outstanding. Dropping it cancels.
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            handle: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs `tick` immediately and then once per period until it breaks or
    /// the task is stopped.
    pub fn start<F, Fut>(&self, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let period = self.period.max(Duration::from_millis(1));
        let name = self.name;
        self.replace(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick().await.is_break() {
                    trace!("{} loop finished", name);
                    break;
                }
            }
        }));
    }

    /// Runs `work` once after `delay`, replacing whatever was scheduled.
    pub fn run_after<Fut>(&self, delay: Duration, work: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.replace(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        }));
    }

    fn replace(&self, next: JoinHandle<()>) {
        let mut slot = self.handle.lock();
        if let Some(prev) = slot.replace(next) {
            prev.abort();
        }
    }

    /// Cancels the outstanding instance. Returns whether one was running.
    pub fn stop(&self) -> bool {
        match self.handle.lock().take() {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                if running {
                    trace!("{} loop cancelled", self.name);
                }
                running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
