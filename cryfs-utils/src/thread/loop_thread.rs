//! A stoppable loop thread registered with the [`ThreadSystem`].

use std::sync::{Arc, Mutex};

use super::thread_system::{LoopBody, ThreadControl, ThreadHandle, ThreadSystem};

/// One managed thread running a loop body. The body returns `true` to keep
/// iterating; stopping interrupts cooperatively between iterations.
///
/// The thread does not start in the constructor; call [`LoopThread::start`].
/// Dropping a running `LoopThread` stops it.
pub struct LoopThread {
    name: String,
    body: LoopBody,
    handle: Option<ThreadHandle>,
}

impl LoopThread {
    pub fn new(
        name: impl Into<String>,
        body: impl FnMut(&ThreadControl) -> bool + Send + 'static,
    ) -> LoopThread {
        LoopThread {
            name: name.into(),
            body: Arc::new(Mutex::new(Box::new(body))),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self) {
        assert!(self.handle.is_none(), "LoopThread is already running");
        self.handle = Some(ThreadSystem::instance().start_shared(self.name.clone(), self.body.clone()));
    }

    pub fn stop(&mut self) {
        let handle = self.handle.take().expect("LoopThread is not running");
        ThreadSystem::instance().stop(handle);
    }
}

impl Drop for LoopThread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[test]
    fn start_and_stop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let mut thread = LoopThread::new("loop-test", move |control| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            control.sleep(Duration::from_millis(1));
            true
        });
        assert!(!thread.is_running());
        thread.start();
        assert!(thread.is_running());
        while counter.load(Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        thread.stop();
        assert!(!thread.is_running());
    }

    #[test]
    fn can_restart_after_stop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let mut thread = LoopThread::new("restart-test", move |control| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            control.sleep(Duration::from_millis(1));
            true
        });
        thread.start();
        while counter.load(Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        thread.stop();
        let after_first_run = counter.load(Ordering::SeqCst);
        thread.start();
        while counter.load(Ordering::SeqCst) == after_first_run {
            std::thread::sleep(Duration::from_millis(1));
        }
        thread.stop();
    }

    #[test]
    fn drop_stops_running_thread() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        {
            let mut thread = LoopThread::new("drop-test", move |control| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                control.sleep(Duration::from_millis(1));
                true
            });
            thread.start();
            while counter.load(Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        let after_drop = counter.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(after_drop, counter.load(Ordering::SeqCst));
    }
}
