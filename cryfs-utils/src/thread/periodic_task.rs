//! A callback invoked at a fixed interval on a managed thread.

use std::time::Duration;

use super::LoopThread;

/// Runs `callback` every `interval` on its own [`LoopThread`], starting
/// immediately on construction. The sleep is interruptible, so dropping a
/// `PeriodicTask` never has to wait out the interval.
pub struct PeriodicTask {
    thread: LoopThread,
}

impl PeriodicTask {
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        callback: impl Fn() + Send + 'static,
    ) -> PeriodicTask {
        let mut thread = LoopThread::new(name, move |control| {
            if control.sleep(interval) {
                // Interrupted while sleeping; skip the callback and let the
                // loop terminate.
                return false;
            }
            callback();
            true
        });
        thread.start();
        PeriodicTask { thread }
    }

    pub fn stop(mut self) {
        self.thread.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn callback_runs_periodically() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let task = PeriodicTask::new("periodic-test", Duration::from_millis(5), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        while counter.load(Ordering::SeqCst) < 3 {
            std::thread::sleep(Duration::from_millis(1));
        }
        task.stop();
    }

    #[test]
    fn drop_stops_task_quickly_despite_long_interval() {
        let task = PeriodicTask::new("slow-periodic", Duration::from_secs(3600), || {});
        let start = std::time::Instant::now();
        drop(task);
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
