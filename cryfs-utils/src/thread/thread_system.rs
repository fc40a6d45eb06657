//! Process-wide registry of managed loop threads.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use tracing::error;

/// The loop body of a managed thread. Returns `true` to run another
/// iteration, `false` to terminate the thread.
pub(crate) type LoopBody = Arc<Mutex<Box<dyn FnMut(&ThreadControl) -> bool + Send>>>;

// ---------------------------------------------------------------------------
// Thread control
// ---------------------------------------------------------------------------

/// Cooperative interruption point shared between a managed thread and the
/// registry. The loop checks it between iterations; loop bodies that sleep
/// do so through [`ThreadControl::sleep`] so stopping does not have to wait
/// out the sleep interval.
pub struct ThreadControl {
    interrupted: Mutex<bool>,
    condition: Condvar,
}

impl ThreadControl {
    fn new() -> Arc<ThreadControl> {
        Arc::new(ThreadControl {
            interrupted: Mutex::new(false),
            condition: Condvar::new(),
        })
    }

    pub fn is_interrupted(&self) -> bool {
        *self.interrupted.lock().unwrap()
    }

    /// Sleep for `duration` or until interrupted. Returns `true` if the
    /// sleep was cut short by an interruption.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = std::time::Instant::now() + duration;
        let mut interrupted = self.interrupted.lock().unwrap();
        loop {
            if *interrupted {
                return true;
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .condition
                .wait_timeout(interrupted, deadline - now)
                .unwrap();
            interrupted = guard;
        }
    }

    fn interrupt(&self) {
        *self.interrupted.lock().unwrap() = true;
        self.condition.notify_all();
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Identifies a managed thread within the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadHandle(u64);

struct ManagedThread {
    id: u64,
    name: String,
    body: LoopBody,
    control: Arc<ThreadControl>,
    join_handle: Option<thread::JoinHandle<()>>,
}

#[derive(Default)]
struct Registry {
    threads: Vec<ManagedThread>,
    next_id: u64,
}

/// Process-wide registry of background loop threads.
pub struct ThreadSystem {
    registry: Mutex<Registry>,
}

impl ThreadSystem {
    pub fn instance() -> &'static ThreadSystem {
        static INSTANCE: OnceLock<ThreadSystem> = OnceLock::new();
        INSTANCE.get_or_init(|| ThreadSystem {
            registry: Mutex::new(Registry::default()),
        })
    }

    /// Start a managed thread running `body` until it returns `false` or
    /// the thread is stopped.
    pub fn start(
        &self,
        name: impl Into<String>,
        body: impl FnMut(&ThreadControl) -> bool + Send + 'static,
    ) -> ThreadHandle {
        self.start_shared(name.into(), Arc::new(Mutex::new(Box::new(body))))
    }

    pub(crate) fn start_shared(&self, name: String, body: LoopBody) -> ThreadHandle {
        let mut registry = self.registry.lock().unwrap();
        let id = registry.next_id;
        registry.next_id += 1;

        let control = ThreadControl::new();
        let join_handle = spawn_thread(&name, body.clone(), control.clone());
        registry.threads.push(ManagedThread {
            id,
            name,
            body,
            control,
            join_handle: Some(join_handle),
        });
        ThreadHandle(id)
    }

    /// Interrupt a managed thread, remove it from the registry and wait for
    /// it to terminate.
    pub fn stop(&self, handle: ThreadHandle) {
        let removed = {
            let mut registry = self.registry.lock().unwrap();
            let index = registry
                .threads
                .iter()
                .position(|thread| thread.id == handle.0);
            index.map(|index| {
                let thread = &registry.threads[index];
                thread.control.interrupt();
                registry.threads.remove(index)
            })
        };
        // Joining doesn't touch registry state, so don't hold the lock.
        if let Some(mut thread) = removed {
            if let Some(join_handle) = thread.join_handle.take() {
                let _ = join_handle.join();
            }
        }
    }

    /// Stop and join every managed thread, keeping the registry entries so
    /// [`ThreadSystem::resume_after_fork`] can restart them. A managed
    /// thread calling this itself is skipped (valid if the child execs
    /// immediately).
    pub fn prepare_fork(&self) {
        let mut registry = self.registry.lock().unwrap();
        let current = thread::current().id();
        for thread in &registry.threads {
            if thread_id_of(&thread.join_handle) == Some(current) {
                continue;
            }
            thread.control.interrupt();
        }
        for thread in &mut registry.threads {
            if thread_id_of(&thread.join_handle) == Some(current) {
                continue;
            }
            if let Some(join_handle) = thread.join_handle.take() {
                let _ = join_handle.join();
            }
        }
    }

    /// Restart every thread stopped by [`ThreadSystem::prepare_fork`].
    pub fn resume_after_fork(&self) {
        let mut registry = self.registry.lock().unwrap();
        for thread in &mut registry.threads {
            if thread.join_handle.is_some() {
                // Still running: this is the thread that forked.
                continue;
            }
            let control = ThreadControl::new();
            let join_handle = spawn_thread(&thread.name, thread.body.clone(), control.clone());
            thread.control = control;
            thread.join_handle = Some(join_handle);
        }
    }

}

fn thread_id_of(join_handle: &Option<thread::JoinHandle<()>>) -> Option<thread::ThreadId> {
    join_handle.as_ref().map(|handle| handle.thread().id())
}

fn spawn_thread(
    name: &str,
    body: LoopBody,
    control: Arc<ThreadControl>,
) -> thread::JoinHandle<()> {
    let thread_name = name.to_string();
    thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || run_loop(&thread_name, body, control))
        .expect("failed to spawn managed thread")
}

fn run_loop(name: &str, body: LoopBody, control: Arc<ThreadControl>) {
    loop {
        if control.is_interrupted() {
            return;
        }
        let iteration = catch_unwind(AssertUnwindSafe(|| (body.lock().unwrap())(&control)));
        match iteration {
            Ok(true) => continue,
            Ok(false) => return,
            Err(_) => {
                error!(thread = name, "managed thread crashed");
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn thread_runs_and_stops() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let handle = ThreadSystem::instance().start("test-thread", move |control| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            control.sleep(Duration::from_millis(1));
            true
        });
        while counter.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        ThreadSystem::instance().stop(handle);
        let after_stop = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(after_stop, counter.load(Ordering::SeqCst));
    }

    #[test]
    fn thread_terminates_when_body_returns_false() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let handle = ThreadSystem::instance().start("one-shot", move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            false
        });
        thread::sleep(Duration::from_millis(50));
        assert_eq!(1, counter.load(Ordering::SeqCst));
        ThreadSystem::instance().stop(handle);
    }

    #[test]
    fn stopping_twice_is_harmless() {
        let handle = ThreadSystem::instance().start("stop-twice", |control| {
            control.sleep(Duration::from_millis(1));
            true
        });
        ThreadSystem::instance().stop(handle);
        ThreadSystem::instance().stop(handle);
    }

    #[test]
    fn fork_hooks_stop_and_restart_threads() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let handle = ThreadSystem::instance().start("forked", move |control| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            control.sleep(Duration::from_millis(1));
            true
        });

        ThreadSystem::instance().prepare_fork();
        let stopped_at = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(stopped_at, counter.load(Ordering::SeqCst));

        ThreadSystem::instance().resume_after_fork();
        while counter.load(Ordering::SeqCst) == stopped_at {
            thread::sleep(Duration::from_millis(1));
        }
        ThreadSystem::instance().stop(handle);
    }

    #[test]
    fn interruptible_sleep_returns_early() {
        let handle = ThreadSystem::instance().start("sleeper", |control| {
            control.sleep(Duration::from_secs(3600));
            true
        });
        // Must return quickly even though the body sleeps for an hour.
        let start = std::time::Instant::now();
        ThreadSystem::instance().stop(handle);
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
