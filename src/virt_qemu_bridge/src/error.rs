use std::ffi::NulError;

use thiserror::Error;

use crate::func::types::{ParameterValue, ReturnValue};

/// The error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A text argument could not be handed to the native library because
    /// it contains an interior NUL byte
    #[error("Error converting CString {0:?}")]
    CStringConversionError(#[from] NulError),

    /// The configuration could not be read from the environment
    #[error("Invalid bridge configuration: {0}")]
    ConfigurationError(#[from] envy::Error),

    /// An operation with the same name is already registered in the module
    #[error("Operation {0} is already registered")]
    DuplicateOperation(String),

    /// A generic error with a message
    #[error("{0}")]
    Error(String),

    /// The wrapped library's global initialization returned a failure code
    #[error("Global initialization of the native library failed with code {0}")]
    GlobalInitializationFailed(i32),

    /// An integer argument does not fit the width of the native parameter
    #[error("Integer argument {0} is out of range for {1}")]
    IntConversionFailure(i64, &'static str),

    /// A prometheus error occurred
    #[error("Prometheus Error {0:?}")]
    Prometheus(#[from] prometheus::Error),

    /// The module has no operation with the given name
    #[error("Operation {0} was not found")]
    OperationNotFound(String),

    /// An argument has the wrong type for its position
    #[error("Failed To Convert Parameter Value {0:?} of type {ty} to {1}", ty = .0.type_name())]
    ParameterValueConversionFailure(ParameterValue, &'static str),

    /// A return value has a different type than the caller expected
    #[error("Failed To Convert Return Value {0:?} to {1:?}")]
    ReturnValueConversionFailure(ReturnValue, &'static str),

    /// An operation was called with an incorrect number of arguments
    #[error("{0}() takes exactly {1} arguments ({2} given)")]
    UnexpectedNoOfArguments(String, usize, usize),
}

impl BridgeError {
    /// Whether this error stems from a malformed argument list, i.e. it
    /// was raised before any native state was touched.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            BridgeError::CStringConversionError(_)
                | BridgeError::IntConversionFailure(..)
                | BridgeError::ParameterValueConversionFailure(..)
                | BridgeError::UnexpectedNoOfArguments(..)
        )
    }
}

/// Creates a `BridgeError::Error` from a string literal or format string
#[macro_export]
macro_rules! new_error {
    ($msg:literal $(,)?) => {{
        let __args = std::format_args!($msg);
        let __err_msg = match __args.as_str() {
            Some(msg) => String::from(msg),
            None => std::format!($msg),
        };
        $crate::BridgeError::Error(__err_msg)
    }};
    ($fmtstr:expr, $($arg:tt)*) => {{
           let __err_msg = std::format!($fmtstr, $($arg)*);
           $crate::BridgeError::Error(__err_msg)
    }};
}

/// Logs an error then returns with it, more or less equivalent to the
/// `bail!` macro in `anyhow` but for `BridgeError`s
#[macro_export]
macro_rules! log_then_return {
    ($msg:literal $(,)?) => {{
        let __err = $crate::new_error!($msg);
        tracing::error!("{}", __err);
        return Err(__err);
    }};
    ($err:expr $(,)?) => {{
        let __err = $err;
        tracing::error!("{}", __err);
        return Err(__err.into());
    }};
    ($fmtstr:expr, $($arg:tt)*) => {{
        let __err = $crate::new_error!($fmtstr, $($arg)*);
        tracing::error!("{}", __err);
        return Err(__err);
    }};
}
