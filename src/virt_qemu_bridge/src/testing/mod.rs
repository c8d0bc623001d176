use std::collections::HashSet;
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::guard::ExecutionLock;
use crate::native::{DomainPtr, QemuApi};

/// A `QemuApi` that only knows how to allocate and free strings, for unit
/// tests of buffer ownership. Command entry points are not expected to be
/// reached.
#[derive(Default)]
pub(crate) struct MallocApi {
    live: Mutex<HashSet<usize>>,
    frees: AtomicUsize,
    initialize_calls: AtomicUsize,
}

impl MallocApi {
    /// Copy `bytes` into a fresh NUL-terminated C allocation.
    pub(crate) fn alloc(&self, bytes: &[u8]) -> *mut c_char {
        let ptr = unsafe { libc::malloc(bytes.len() + 1) } as *mut u8;
        assert!(!ptr.is_null(), "malloc failed");
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
            *ptr.add(bytes.len()) = 0;
        }
        self.live.lock().unwrap().insert(ptr as usize);
        ptr as *mut c_char
    }

    pub(crate) fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub(crate) fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    pub(crate) fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }
}

impl QemuApi for MallocApi {
    fn initialize(&self) -> c_int {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        0
    }

    unsafe fn qemu_monitor_command(
        &self,
        _domain: DomainPtr,
        _cmd: *const c_char,
        _result: *mut *mut c_char,
        _flags: c_uint,
    ) -> c_int {
        panic!("MallocApi does not run monitor commands")
    }

    unsafe fn qemu_agent_command(
        &self,
        _domain: DomainPtr,
        _cmd: *const c_char,
        _timeout: c_int,
        _flags: c_uint,
    ) -> *mut c_char {
        panic!("MallocApi does not run agent commands")
    }

    unsafe fn free(&self, ptr: *mut c_char) {
        let known = self.live.lock().unwrap().remove(&(ptr as usize));
        assert!(known, "freed a pointer that was not allocated or already freed");
        self.frees.fetch_add(1, Ordering::SeqCst);
        unsafe { libc::free(ptr as *mut c_void) }
    }
}

/// An `ExecutionLock` that only counts how often it is released and
/// reacquired.
#[derive(Default)]
pub(crate) struct CountingLock {
    releases: AtomicUsize,
    reacquires: AtomicUsize,
}

impl CountingLock {
    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub(crate) fn reacquires(&self) -> usize {
        self.reacquires.load(Ordering::SeqCst)
    }
}

impl ExecutionLock for CountingLock {
    fn release(&self) -> bool {
        self.releases.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn reacquire(&self) {
        self.reacquires.fetch_add(1, Ordering::SeqCst);
    }
}
