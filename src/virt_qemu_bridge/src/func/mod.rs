use std::sync::Arc;

use crate::config::BridgeConfiguration;
use crate::guard::ExecutionLock;
use crate::handle::context::Context;
use crate::native::QemuApi;
use crate::Result;

/// Arity-specific prototypes for bridged operations, and the definitions
/// recorded for them in a module.
///
/// An operation is a plain Rust function taking an `Invocation` followed
/// by typed arguments. Registering it wraps it into a `BridgeFunction`
/// that checks the arity of the interpreter's argument list and marshals
/// each element before calling it.
pub mod operation;
/// Definitions and functionality for supported parameter types
pub mod param_type;
/// Definitions and functionality for supported return types
pub mod ret_type;
/// The interpreter-level value types that cross the bridge.
pub mod types;

pub use operation::{Operation1, Operation2, Operation3, Operation4, OperationDefinition};
pub use param_type::SupportedParameterType;
pub use ret_type::SupportedReturnType;
pub use types::{ParameterType, ParameterValue, ReturnType, ReturnValue};

/// Everything a bridged operation may touch during one call.
///
/// Nothing in here outlives the call.
pub struct Invocation<'a> {
    /// The name the operation was called by
    pub name: &'a str,
    /// Where the interpreter's object references are resolved
    pub ctx: &'a Context,
    /// The wrapped native library
    pub api: &'a dyn QemuApi,
    /// The interpreter's execution lock, released around native calls
    pub lock: &'a dyn ExecutionLock,
    /// Module configuration
    pub config: &'a BridgeConfiguration,
}

type BridgeFn =
    Arc<dyn Fn(&Invocation<'_>, Vec<ParameterValue>) -> Result<ReturnValue> + Send + Sync>;

/// A registered operation, type-erased to take and return interpreter
/// values.
///
/// Operations are `Fn` rather than `FnMut` so that several interpreter
/// threads can be inside the same operation while the execution lock is
/// released.
#[derive(Clone)]
pub struct BridgeFunction(BridgeFn);

impl BridgeFunction {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(&Invocation<'_>, Vec<ParameterValue>) -> Result<ReturnValue> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, inv: &Invocation<'_>, args: Vec<ParameterValue>) -> Result<ReturnValue> {
        (self.0)(inv, args)
    }
}

impl std::fmt::Debug for BridgeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BridgeFunction")
    }
}
