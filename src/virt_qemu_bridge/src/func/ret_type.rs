use crate::func::types::{ReturnType, ReturnValue};
use crate::BridgeError::ReturnValueConversionFailure;
use crate::Result;

/// This is a marker trait that is used to indicate that a type is a valid
/// return type of a bridged operation.
pub trait SupportedReturnType<T> {
    /// Gets the return type of the supported return value
    fn get_return_type() -> ReturnType;

    /// Gets the interpreter value of the supported return value
    fn get_return_value(&self) -> ReturnValue;

    /// Gets the inner value of the supported return type
    fn get_inner(a: ReturnValue) -> Result<T>;
}

/// Text, with `None` as the "no result" sentinel.
impl SupportedReturnType<Option<String>> for Option<String> {
    fn get_return_type() -> ReturnType {
        ReturnType::OptionalString
    }

    fn get_return_value(&self) -> ReturnValue {
        match self {
            Some(s) => ReturnValue::String(s.clone()),
            None => ReturnValue::None,
        }
    }

    fn get_inner(a: ReturnValue) -> Result<Option<String>> {
        match a {
            ReturnValue::String(s) => Ok(Some(s)),
            ReturnValue::None => Ok(None),
            other => Err(ReturnValueConversionFailure(other, "Option<String>")),
        }
    }
}

impl SupportedReturnType<i32> for i32 {
    fn get_return_type() -> ReturnType {
        ReturnType::Int
    }

    fn get_return_value(&self) -> ReturnValue {
        ReturnValue::Int(*self)
    }

    fn get_inner(a: ReturnValue) -> Result<i32> {
        match a {
            ReturnValue::Int(i) => Ok(i),
            other => Err(ReturnValueConversionFailure(other, "i32")),
        }
    }
}
