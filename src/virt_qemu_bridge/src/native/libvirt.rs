use std::os::raw::{c_char, c_int, c_uint, c_void};

use super::{DomainPtr, QemuApi, RawDomain};

#[link(name = "virt")]
extern "C" {
    fn virInitialize() -> c_int;
}

#[link(name = "virt-qemu")]
extern "C" {
    fn virDomainQemuMonitorCommand(
        domain: RawDomain,
        cmd: *const c_char,
        result: *mut *mut c_char,
        flags: c_uint,
    ) -> c_int;

    fn virDomainQemuAgentCommand(
        domain: RawDomain,
        cmd: *const c_char,
        timeout: c_int,
        flags: c_uint,
    ) -> *mut c_char;
}

/// `QemuApi` backed by the system's libvirt-qemu library.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibvirtQemu;

impl QemuApi for LibvirtQemu {
    fn initialize(&self) -> c_int {
        // SAFETY: virInitialize takes no arguments and may be called more
        // than once.
        unsafe { virInitialize() }
    }

    unsafe fn qemu_monitor_command(
        &self,
        domain: DomainPtr,
        cmd: *const c_char,
        result: *mut *mut c_char,
        flags: c_uint,
    ) -> c_int {
        // SAFETY: forwarded from the caller's contract.
        unsafe { virDomainQemuMonitorCommand(domain.as_ptr(), cmd, result, flags) }
    }

    unsafe fn qemu_agent_command(
        &self,
        domain: DomainPtr,
        cmd: *const c_char,
        timeout: c_int,
        flags: c_uint,
    ) -> *mut c_char {
        // SAFETY: forwarded from the caller's contract.
        unsafe { virDomainQemuAgentCommand(domain.as_ptr(), cmd, timeout, flags) }
    }

    unsafe fn free(&self, ptr: *mut c_char) {
        // libvirt allocates replies with the C allocator
        unsafe { libc::free(ptr as *mut c_void) }
    }
}
