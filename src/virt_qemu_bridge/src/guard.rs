use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use once_cell::sync::Lazy;
use tracing::{instrument, trace, warn, Span};

/// The process-wide exclusive execution lock of the interpreter.
///
/// Interpreter-level code runs while holding it. A bridge call releases it
/// for the duration of a blocking native call and reacquires it before any
/// interpreter value is built.
pub trait ExecutionLock: Send + Sync {
    /// Give up exclusive execution so other interpreter threads can run.
    /// Returns `false` if the calling thread did not hold it, in which case
    /// nothing changed and nothing must be reacquired.
    fn release(&self) -> bool;
    /// Block until exclusive execution is regained.
    fn reacquire(&self);
}

/// Scope in which the execution lock is released.
///
/// Creating the guard releases the lock; dropping it reacquires it, but
/// only if the release actually happened. The lock therefore ends up in the
/// state it was in before the guard on every exit path, including early
/// returns and unwinding panics.
pub struct BlockingCallGuard<'a> {
    lock: &'a dyn ExecutionLock,
    released: bool,
}

impl<'a> BlockingCallGuard<'a> {
    /// Release `lock` until the returned guard is dropped.
    pub fn new(lock: &'a dyn ExecutionLock) -> Self {
        let released = lock.release();
        if released {
            trace!("execution lock released");
        } else {
            warn!("blocking call made without holding the execution lock");
        }
        BlockingCallGuard { lock, released }
    }
}

impl Drop for BlockingCallGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            self.lock.reacquire();
            trace!("execution lock reacquired");
        }
    }
}

/// Run `f`, which may block on native I/O, with `lock` released.
#[instrument(skip_all, parent = Span::current(), level = "Trace")]
pub fn allow_threads<T, F>(lock: &dyn ExecutionLock, f: F) -> T
where
    F: FnOnce() -> T,
{
    let _guard = BlockingCallGuard::new(lock);
    f()
}

static GLOBAL_INTERPRETER_LOCK: Lazy<Arc<InterpreterLock>> =
    Lazy::new(|| Arc::new(InterpreterLock::new()));

/// An exclusive lock owned by at most one thread at a time.
#[derive(Debug, Default)]
pub struct InterpreterLock {
    owner: Mutex<Option<ThreadId>>,
    available: Condvar,
}

impl InterpreterLock {
    /// Create a lock that nobody holds.
    pub fn new() -> Self {
        Self::default()
    }

    /// The single lock shared by the whole process.
    pub fn global() -> Arc<InterpreterLock> {
        Arc::clone(&GLOBAL_INTERPRETER_LOCK)
    }

    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        // the protected state is a plain thread id, so it stays consistent
        // even if a holder panicked
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the current thread holds the lock. Does nothing if it
    /// already does. Returns whether this call took the lock.
    pub fn acquire(&self) -> bool {
        let me = thread::current().id();
        let mut owner = self.owner();
        loop {
            match *owner {
                None => break,
                Some(id) if id == me => {
                    warn!("interpreter lock acquired twice by the same thread");
                    return false;
                }
                Some(_) => {
                    owner = self
                        .available
                        .wait(owner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        *owner = Some(me);
        true
    }

    /// Give the lock up. Only the holding thread can release it; for any
    /// other thread this does nothing and returns `false`.
    pub fn release(&self) -> bool {
        let me = thread::current().id();
        let mut owner = self.owner();
        if *owner == Some(me) {
            *owner = None;
            drop(owner);
            self.available.notify_one();
            true
        } else {
            warn!("interpreter lock released by a thread that does not hold it");
            false
        }
    }

    /// Whether the calling thread currently holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        *self.owner() == Some(thread::current().id())
    }

    /// Acquire the lock and hold it until the returned value is dropped.
    ///
    /// If the current thread already holds the lock, dropping the returned
    /// value leaves it held.
    pub fn hold(&self) -> HeldLock<'_> {
        let owned = self.acquire();
        HeldLock { lock: self, owned }
    }
}

impl ExecutionLock for InterpreterLock {
    fn release(&self) -> bool {
        InterpreterLock::release(self)
    }

    fn reacquire(&self) {
        self.acquire();
    }
}

/// Proof that the current thread holds an `InterpreterLock`.
#[must_use = "the lock is released as soon as this is dropped"]
pub struct HeldLock<'a> {
    lock: &'a InterpreterLock,
    owned: bool,
}

impl Drop for HeldLock<'_> {
    fn drop(&mut self) {
        if self.owned {
            self.lock.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::{allow_threads, BlockingCallGuard, InterpreterLock};
    use crate::testing::CountingLock;

    #[test]
    fn guard_pairs_release_and_reacquire() {
        let lock = CountingLock::default();
        {
            let _guard = BlockingCallGuard::new(&lock);
            assert_eq!(lock.releases(), 1);
            assert_eq!(lock.reacquires(), 0);
        }
        assert_eq!(lock.releases(), 1);
        assert_eq!(lock.reacquires(), 1);
    }

    #[test]
    fn allow_threads_returns_the_closure_value() {
        let lock = CountingLock::default();
        let v = allow_threads(&lock, || -1);
        assert_eq!(v, -1);
        assert_eq!(lock.releases(), lock.reacquires());
    }

    #[test]
    fn panic_inside_bracket_still_reacquires() {
        let lock = CountingLock::default();
        let res = catch_unwind(AssertUnwindSafe(|| {
            allow_threads(&lock, || panic!("native call blew up"))
        }));
        assert!(res.is_err());
        assert_eq!(lock.releases(), 1);
        assert_eq!(lock.reacquires(), 1);
    }

    #[test]
    fn held_lock_is_released_on_drop() {
        let lock = InterpreterLock::new();
        {
            let _held = lock.hold();
            assert!(lock.is_held_by_current_thread());
        }
        assert!(!lock.is_held_by_current_thread());
    }

    #[test]
    fn release_by_non_owner_is_ignored() {
        let lock = Arc::new(InterpreterLock::new());
        let _held = lock.hold();
        let other = Arc::clone(&lock);
        let released = thread::spawn(move || other.release())
            .join()
            .expect("thread panicked");
        assert!(!released);
        assert!(lock.is_held_by_current_thread());
    }

    #[test]
    fn blocking_call_without_the_lock_leaves_it_free() {
        let lock = Arc::new(InterpreterLock::new());
        let v = allow_threads(lock.as_ref(), || 7);
        assert_eq!(v, 7);
        assert!(!lock.is_held_by_current_thread());

        let (tx, rx) = mpsc::channel();
        let other = Arc::clone(&lock);
        let worker = thread::spawn(move || {
            let _held = other.hold();
            tx.send(()).expect("send");
        });
        rx.recv_timeout(Duration::from_secs(5))
            .expect("another thread should get the lock");
        worker.join().expect("worker panicked");
    }

    #[test]
    fn blocking_call_while_another_thread_holds_the_lock_does_not_wait() {
        let lock = Arc::new(InterpreterLock::new());
        let (held_tx, held_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let other = Arc::clone(&lock);
        let holder = thread::spawn(move || {
            let _held = other.hold();
            held_tx.send(()).expect("send");
            done_rx.recv().expect("recv");
        });
        held_rx.recv().expect("holder should take the lock");

        // returns without blocking on the holder
        allow_threads(lock.as_ref(), || ());
        assert!(!lock.is_held_by_current_thread());

        done_tx.send(()).expect("send");
        holder.join().expect("holder panicked");
    }

    #[test]
    fn nested_hold_keeps_the_outer_hold() {
        let lock = InterpreterLock::new();
        let _outer = lock.hold();
        {
            let _inner = lock.hold();
        }
        assert!(lock.is_held_by_current_thread());
    }

    #[test]
    fn other_threads_run_while_released() {
        let lock = Arc::new(InterpreterLock::new());
        let held = lock.hold();
        let (tx, rx) = mpsc::channel();

        let other = Arc::clone(&lock);
        let worker = thread::spawn(move || {
            other.acquire();
            tx.send(()).expect("send");
            other.release();
        });

        // the worker cannot get in while we hold the lock
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        allow_threads(lock.as_ref(), || {
            rx.recv_timeout(Duration::from_secs(5))
                .expect("worker should run while the lock is released");
        });
        assert!(lock.is_held_by_current_thread());
        drop(held);
        worker.join().expect("worker panicked");
    }
}
