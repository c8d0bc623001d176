use std::os::raw::{c_char, c_int, c_uint};
use std::ptr::NonNull;

/// Bindings to the system libvirt and libvirt-qemu libraries
#[cfg(feature = "libvirt")]
pub mod libvirt;
/// Ownership of strings allocated by the native library
pub mod string;

/// The native library's domain object. Only ever handled by pointer; its
/// layout belongs to the library.
#[repr(C)]
pub struct VirDomain {
    _private: [u8; 0],
}

/// A raw domain pointer as the native library hands it out. May be null.
pub type RawDomain = *mut VirDomain;

/// A domain pointer that has been checked to be non-null.
///
/// The bridge never owns the domain; a `DomainPtr` is borrowed for the
/// duration of a single native call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DomainPtr(NonNull<VirDomain>);

// The native library synchronises access to its domain objects internally.
unsafe impl Send for DomainPtr {}
unsafe impl Sync for DomainPtr {}

impl DomainPtr {
    /// Wrap `raw`, or return `None` if it is null.
    pub fn new(raw: RawDomain) -> Option<Self> {
        NonNull::new(raw).map(DomainPtr)
    }

    /// The pointer to pass back to the native library.
    pub fn as_ptr(&self) -> RawDomain {
        self.0.as_ptr()
    }
}

/// The entry points of the wrapped virtualization library that the bridge
/// calls into.
///
/// The production implementation links against libvirt (see the `libvirt`
/// feature); tests substitute a fake.
pub trait QemuApi: Send + Sync {
    /// One-time global initialization of the library. Negative on failure.
    fn initialize(&self) -> c_int;

    /// Send `cmd` to the domain's QEMU monitor.
    ///
    /// Returns a negative status on failure. On success the reply has been
    /// written to `*result` and must be released with `free`.
    ///
    /// # Safety
    ///
    /// `domain` must be a live domain of this library, `cmd` must be null
    /// or a NUL-terminated string, and `result` must be valid for writes.
    unsafe fn qemu_monitor_command(
        &self,
        domain: DomainPtr,
        cmd: *const c_char,
        result: *mut *mut c_char,
        flags: c_uint,
    ) -> c_int;

    /// Send `cmd` to the guest agent of the domain, waiting up to
    /// `timeout` seconds (or one of the special timeout values).
    ///
    /// Returns null on failure or timeout, otherwise a reply that must be
    /// released with `free`.
    ///
    /// # Safety
    ///
    /// `domain` must be a live domain of this library and `cmd` must be
    /// null or a NUL-terminated string.
    unsafe fn qemu_agent_command(
        &self,
        domain: DomainPtr,
        cmd: *const c_char,
        timeout: c_int,
        flags: c_uint,
    ) -> *mut c_char;

    /// Release a string the library allocated.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this library and not freed yet.
    unsafe fn free(&self, ptr: *mut c_char);
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::{DomainPtr, VirDomain};

    #[test]
    fn null_domain_is_rejected() {
        assert!(DomainPtr::new(ptr::null_mut()).is_none());
    }

    #[test]
    fn non_null_domain_round_trips() {
        let raw = 0x1000usize as *mut VirDomain;
        let dom = DomainPtr::new(raw).expect("non-null pointer");
        assert_eq!(dom.as_ptr(), raw);
    }
}
