use std::os::raw::{c_char, c_int};

use strum::IntoStaticStr;

use crate::native::string::NativeString;
use crate::native::QemuApi;

/// Outcome of translating one native result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translated {
    /// The native call succeeded and produced text
    Reply(String),
    /// The interpreter gets the "no result" sentinel
    NoResult(NoResultReason),
}

/// Why a call produced the "no result" sentinel. Only used for logging and
/// metrics; the interpreter cannot tell these apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum NoResultReason {
    /// The object reference did not resolve to a live domain
    InvalidHandle,
    /// Negative status code or null reply pointer
    NativeFailure,
}

impl Translated {
    /// Collapse into the value the interpreter sees.
    pub fn into_option(self) -> Option<String> {
        match self {
            Translated::Reply(s) => Some(s),
            Translated::NoResult(_) => None,
        }
    }
}

/// Translate a status code plus out-parameter result.
///
/// A negative `code` is a failure: `out` is not guaranteed to be populated
/// then, so it is neither read nor freed. Otherwise the reply is copied and
/// `out` freed.
///
/// # Safety
///
/// If `code` is non-negative, `out` must be null or a NUL-terminated
/// string allocated by `api`'s library that the caller hands over.
pub unsafe fn from_status_and_out_param(
    api: &dyn QemuApi,
    code: c_int,
    out: *mut c_char,
) -> Translated {
    if code < 0 {
        return Translated::NoResult(NoResultReason::NativeFailure);
    }
    // SAFETY: forwarded from the caller's contract.
    unsafe { from_pointer(api, out) }
}

/// Translate a direct pointer result, where null signals failure.
///
/// # Safety
///
/// `ptr` must be null or a NUL-terminated string allocated by `api`'s
/// library that the caller hands over.
pub unsafe fn from_pointer(api: &dyn QemuApi, ptr: *mut c_char) -> Translated {
    // SAFETY: forwarded from the caller's contract.
    match unsafe { NativeString::from_raw(api, ptr) } {
        Some(reply) => Translated::Reply(reply.into_string()),
        None => Translated::NoResult(NoResultReason::NativeFailure),
    }
}
