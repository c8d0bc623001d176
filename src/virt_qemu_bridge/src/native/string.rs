use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr::NonNull;

use tracing::{instrument, Span};

use super::QemuApi;

/// A NUL-terminated string allocated by the native library, owned by the
/// bridge for one call.
///
/// The buffer is released through `QemuApi::free` when the `NativeString`
/// is dropped, so every exit path frees it exactly once.
pub struct NativeString<'a> {
    ptr: NonNull<c_char>,
    api: &'a dyn QemuApi,
}

impl<'a> NativeString<'a> {
    /// Take ownership of `ptr`, or return `None` if it is null.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a NUL-terminated string allocated by
    /// `api`'s library that nothing else will free.
    pub unsafe fn from_raw(api: &'a dyn QemuApi, ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| NativeString { ptr, api })
    }

    /// Borrow the bytes of the string, without the terminator.
    pub fn as_c_str(&self) -> &CStr {
        // SAFETY: `from_raw` requires a NUL-terminated string that lives
        // until we free it in `drop`.
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    /// Copy the contents into an owned `String`, replacing invalid UTF-8,
    /// and release the native buffer.
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    pub fn into_string(self) -> String {
        self.as_c_str().to_string_lossy().into_owned()
    }
}

impl Drop for NativeString<'_> {
    fn drop(&mut self) {
        // SAFETY: we own the buffer and this is the only place it is freed.
        unsafe { self.api.free(self.ptr.as_ptr()) }
    }
}
