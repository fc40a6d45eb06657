//! Managed worker threads.
//!
//! [`ThreadSystem`] is a process-wide registry of loop threads. Its purpose
//! is fork safety: a process that wants to `fork()` calls
//! [`ThreadSystem::prepare_fork`] first (stops and joins every managed
//! thread, so none of them holds a lock across the fork) and
//! [`ThreadSystem::resume_after_fork`] afterwards in parent and child. On
//! hosts that never fork the registry is simply a thread pool.
//!
//! [`LoopThread`] wraps one managed thread running a loop body until the
//! body returns `false` or the thread is stopped; interruption is
//! cooperative between iterations. [`PeriodicTask`] runs a callback at a
//! fixed interval on a loop thread, with an interruptible sleep.

mod loop_thread;
mod periodic_task;
mod thread_system;

pub use loop_thread::LoopThread;
pub use periodic_task::PeriodicTask;
pub use thread_system::{ThreadControl, ThreadHandle, ThreadSystem};
