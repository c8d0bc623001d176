use std::ffi::CString;
use std::os::raw::{c_int, c_uint};

use tracing::{instrument, Span};

use crate::func::types::{ParameterType, ParameterValue};
use crate::handle::Handle;
use crate::BridgeError::{IntConversionFailure, ParameterValueConversionFailure};
use crate::{log_then_return, Result};

/// This is a marker trait that is used to indicate that a type is a
/// valid argument type for a bridged operation.
///
/// Each implementation is one element of a format descriptor: it names its
/// `ParameterType` and knows how to narrow an interpreter value into the
/// native representation.
pub trait SupportedParameterType<T> {
    /// Get the descriptor element representing this type
    fn get_parameter_type() -> ParameterType;
    /// Get the interpreter value representing this value
    fn get_parameter_value(&self) -> ParameterValue;
    /// Convert an interpreter value into the native representation
    fn get_inner(a: ParameterValue) -> Result<T>;
}

/// An object reference; `None` stands for the interpreter's `None`.
impl SupportedParameterType<Option<Handle>> for Option<Handle> {
    fn get_parameter_type() -> ParameterType {
        ParameterType::Object
    }

    fn get_parameter_value(&self) -> ParameterValue {
        ParameterValue::from(*self)
    }

    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    fn get_inner(a: ParameterValue) -> Result<Option<Handle>> {
        match a {
            ParameterValue::Object(h) => Ok(Some(h)),
            ParameterValue::None => Ok(None),
            other => {
                log_then_return!(ParameterValueConversionFailure(other, "object"));
            }
        }
    }
}

/// Nullable text, already converted to a NUL-terminated string for the
/// native call.
impl SupportedParameterType<Option<CString>> for Option<CString> {
    fn get_parameter_type() -> ParameterType {
        ParameterType::NullableString
    }

    fn get_parameter_value(&self) -> ParameterValue {
        match self {
            Some(s) => ParameterValue::String(s.to_string_lossy().into_owned()),
            None => ParameterValue::None,
        }
    }

    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    fn get_inner(a: ParameterValue) -> Result<Option<CString>> {
        match a {
            ParameterValue::String(s) => Ok(Some(CString::new(s)?)),
            ParameterValue::None => Ok(None),
            other => {
                log_then_return!(ParameterValueConversionFailure(other, "str or None"));
            }
        }
    }
}

impl SupportedParameterType<c_uint> for c_uint {
    fn get_parameter_type() -> ParameterType {
        ParameterType::UInt
    }

    fn get_parameter_value(&self) -> ParameterValue {
        ParameterValue::Int(i64::from(*self))
    }

    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    fn get_inner(a: ParameterValue) -> Result<c_uint> {
        match a {
            ParameterValue::Int(i) => match c_uint::try_from(i) {
                Ok(v) => Ok(v),
                Err(_) => {
                    log_then_return!(IntConversionFailure(i, "unsigned int"));
                }
            },
            other => {
                log_then_return!(ParameterValueConversionFailure(other, "unsigned int"));
            }
        }
    }
}

impl SupportedParameterType<c_int> for c_int {
    fn get_parameter_type() -> ParameterType {
        ParameterType::Int
    }

    fn get_parameter_value(&self) -> ParameterValue {
        ParameterValue::Int(i64::from(*self))
    }

    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    fn get_inner(a: ParameterValue) -> Result<c_int> {
        match a {
            ParameterValue::Int(i) => match c_int::try_from(i) {
                Ok(v) => Ok(v),
                Err(_) => {
                    log_then_return!(IntConversionFailure(i, "int"));
                }
            },
            other => {
                log_then_return!(ParameterValueConversionFailure(other, "int"));
            }
        }
    }
}
