// This crate contains testing utilities which need to be shared across multiple
// crates in this project.
use std::collections::{HashSet, VecDeque};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use virt_qemu_bridge::native::{DomainPtr, RawDomain, VirDomain};
use virt_qemu_bridge::{ExecutionLock, QemuApi};

/// A `log` implementation that records every call, for asserting on what
/// the bridge logs
pub mod logger;

/// A fake domain pointer. It is never dereferenced by the bridge or by
/// `FakeQemu`, so any non-null address will do.
pub fn domain(n: usize) -> RawDomain {
    (0x1000 + n * 0x10) as *mut VirDomain
}

/// What the next monitor command call does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorReply {
    /// Return 0 and hand a freshly allocated copy of the text back
    Success(String),
    /// Return the (negative) code and leave the out-parameter untouched
    Failure(c_int),
    /// Return the (negative) code but write a buffer into the
    /// out-parameter anyway. The buffer stays owned by the fake.
    FailureWithBuffer(c_int, String),
    /// Panic inside the native call
    Panic,
}

/// What the next agent command call does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentReply {
    /// Return a freshly allocated copy of the text
    Reply(String),
    /// Return null, as on failure or timeout
    Null,
    /// Panic inside the native call
    Panic,
}

/// A native call as `FakeQemu` received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    /// A monitor command call
    Monitor {
        /// The address of the domain passed in
        domain: usize,
        /// The command text, `None` if null was passed
        cmd: Option<String>,
        /// The raw flags
        flags: c_uint,
    },
    /// An agent command call
    Agent {
        /// The address of the domain passed in
        domain: usize,
        /// The command text, `None` if null was passed
        cmd: Option<String>,
        /// The raw timeout
        timeout: c_int,
        /// The raw flags
        flags: c_uint,
    },
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// A scripted stand-in for the libvirt-qemu library.
///
/// Replies are consumed in the order they were pushed; once a script runs
/// out the monitor command fails with -1 and the agent command returns
/// null. Every buffer handed to the bridge is allocated with `malloc` and
/// tracked until the bridge frees it, so leaks and double frees show up in
/// `live_allocations` or as a panic in `free`.
pub struct FakeQemu {
    init_status: c_int,
    initialize_calls: AtomicUsize,
    monitor_replies: Mutex<VecDeque<MonitorReply>>,
    agent_replies: Mutex<VecDeque<AgentReply>>,
    calls: Mutex<Vec<NativeCall>>,
    live: Mutex<HashSet<usize>>,
    retained: Mutex<Vec<usize>>,
    frees: AtomicUsize,
    on_call: Option<Hook>,
}

impl Default for FakeQemu {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeQemu {
    /// A fake whose global initialization succeeds and that has no
    /// scripted replies.
    pub fn new() -> Self {
        Self {
            init_status: 0,
            initialize_calls: AtomicUsize::new(0),
            monitor_replies: Mutex::new(VecDeque::new()),
            agent_replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            live: Mutex::new(HashSet::new()),
            retained: Mutex::new(Vec::new()),
            frees: AtomicUsize::new(0),
            on_call: None,
        }
    }

    /// Make global initialization return `status`.
    pub fn with_init_status(mut self, status: c_int) -> Self {
        self.init_status = status;
        self
    }

    /// Run `hook` inside every native command call, before replying.
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_call = Some(Box::new(hook));
        self
    }

    /// Script the next monitor command reply.
    pub fn push_monitor_reply(&self, reply: MonitorReply) {
        lock(&self.monitor_replies).push_back(reply);
    }

    /// Script the next agent command reply.
    pub fn push_agent_reply(&self, reply: AgentReply) {
        lock(&self.agent_replies).push_back(reply);
    }

    /// How often global initialization ran.
    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    /// Every command call received so far, in order.
    pub fn calls(&self) -> Vec<NativeCall> {
        lock(&self.calls).clone()
    }

    /// The number of command calls received so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Buffers handed to the bridge and not yet freed.
    pub fn live_allocations(&self) -> usize {
        lock(&self.live).len()
    }

    /// The number of buffers the bridge has freed.
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    /// Ensure every buffer handed out has been freed exactly once.
    pub fn check_no_leaks(&self) -> Result<()> {
        match self.live_allocations() {
            0 => Ok(()),
            n => Err(anyhow!("{} native buffer(s) were never freed", n)),
        }
    }

    fn alloc(text: &str) -> *mut c_char {
        let bytes = text.as_bytes();
        // SAFETY: the allocation is sized for the bytes plus a terminator
        unsafe {
            let p = libc::malloc(bytes.len() + 1) as *mut u8;
            assert!(!p.is_null(), "malloc failed");
            ptr::copy_nonoverlapping(bytes.as_ptr(), p, bytes.len());
            *p.add(bytes.len()) = 0;
            p as *mut c_char
        }
    }

    fn hand_out(&self, text: &str) -> *mut c_char {
        let p = Self::alloc(text);
        lock(&self.live).insert(p as usize);
        p
    }

    fn record(&self, call: NativeCall) {
        lock(&self.calls).push(call);
        if let Some(hook) = &self.on_call {
            hook();
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

unsafe fn read_cmd(cmd: *const c_char) -> Option<String> {
    if cmd.is_null() {
        None
    } else {
        // SAFETY: the bridge passes NUL-terminated commands
        Some(unsafe { CStr::from_ptr(cmd) }.to_string_lossy().into_owned())
    }
}

impl QemuApi for FakeQemu {
    fn initialize(&self) -> c_int {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        self.init_status
    }

    unsafe fn qemu_monitor_command(
        &self,
        domain: DomainPtr,
        cmd: *const c_char,
        result: *mut *mut c_char,
        flags: c_uint,
    ) -> c_int {
        self.record(NativeCall::Monitor {
            domain: domain.as_ptr() as usize,
            cmd: unsafe { read_cmd(cmd) },
            flags,
        });
        let reply = lock(&self.monitor_replies)
            .pop_front()
            .unwrap_or(MonitorReply::Failure(-1));
        match reply {
            MonitorReply::Success(text) => {
                unsafe { *result = self.hand_out(&text) };
                0
            }
            MonitorReply::Failure(code) => code,
            MonitorReply::FailureWithBuffer(code, text) => {
                let p = Self::alloc(&text);
                lock(&self.retained).push(p as usize);
                unsafe { *result = p };
                code
            }
            MonitorReply::Panic => panic!("monitor command panicked"),
        }
    }

    unsafe fn qemu_agent_command(
        &self,
        domain: DomainPtr,
        cmd: *const c_char,
        timeout: c_int,
        flags: c_uint,
    ) -> *mut c_char {
        self.record(NativeCall::Agent {
            domain: domain.as_ptr() as usize,
            cmd: unsafe { read_cmd(cmd) },
            timeout,
            flags,
        });
        let reply = lock(&self.agent_replies)
            .pop_front()
            .unwrap_or(AgentReply::Null);
        match reply {
            AgentReply::Reply(text) => self.hand_out(&text),
            AgentReply::Null => ptr::null_mut(),
            AgentReply::Panic => panic!("agent command panicked"),
        }
    }

    unsafe fn free(&self, ptr: *mut c_char) {
        let known = lock(&self.live).remove(&(ptr as usize));
        assert!(known, "freed a buffer that was not handed out or already freed");
        self.frees.fetch_add(1, Ordering::SeqCst);
        unsafe { libc::free(ptr as *mut c_void) }
    }
}

impl Drop for FakeQemu {
    fn drop(&mut self) {
        for p in lock(&self.retained).drain(..) {
            // SAFETY: retained buffers were never handed over
            unsafe { libc::free(p as *mut c_void) }
        }
    }
}

/// An `ExecutionLock` that counts how often it is released and reacquired.
#[derive(Debug, Default)]
pub struct CountingLock {
    releases: AtomicUsize,
    reacquires: AtomicUsize,
}

impl CountingLock {
    /// The number of releases so far
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// The number of reacquisitions so far
    pub fn reacquires(&self) -> usize {
        self.reacquires.load(Ordering::SeqCst)
    }

    /// Whether the lock is currently given up
    pub fn is_released(&self) -> bool {
        self.releases() > self.reacquires()
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
