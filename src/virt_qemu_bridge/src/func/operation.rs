use std::fmt;

use super::param_type::SupportedParameterType;
use super::ret_type::SupportedReturnType;
use super::types::{ParameterType, ParameterValue, ReturnType};
use super::{BridgeFunction, Invocation};
use crate::module::ModuleBuilder;
use crate::BridgeError::UnexpectedNoOfArguments;
use crate::Result;

/// The name and format descriptor of a registered operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDefinition {
    /// The name the interpreter calls the operation by
    pub name: String,
    /// One element per positional argument
    pub parameter_types: Vec<ParameterType>,
    /// What the operation hands back
    pub return_type: ReturnType,
}

impl OperationDefinition {
    /// Create a new `OperationDefinition`.
    pub fn new(name: &str, parameter_types: Vec<ParameterType>, return_type: ReturnType) -> Self {
        Self {
            name: name.to_string(),
            parameter_types,
            return_type,
        }
    }

    /// The number of positional arguments the operation takes.
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

impl fmt::Display for OperationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, t) in self.parameter_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

macro_rules! impl_operation {
    ($trait:ident, $arity:literal, $($p:ident: $P:ident),+) => {
        #[doc = concat!(
            "An operation that takes ", stringify!($arity),
            " marshalled argument(s) and returns a `Result` of type `R`."
        )]
        pub trait $trait<$($P,)+ R> {
            /// Wrap `self` into a type-erased function plus the definition
            /// describing its format.
            fn into_operation(self, name: &str) -> (OperationDefinition, BridgeFunction);

            /// Register `self` under `name` in `builder`.
            fn register(self, builder: &mut ModuleBuilder, name: &str) -> Result<()>
            where
                Self: Sized,
            {
                let (definition, func) = self.into_operation(name);
                builder.register_function(definition, func)
            }
        }

        impl<F, $($P,)+ R> $trait<$($P,)+ R> for F
        where
            F: Fn(&Invocation<'_>, $($P),+) -> Result<R> + Send + Sync + 'static,
            $($P: SupportedParameterType<$P>,)+
            R: SupportedReturnType<R>,
        {
            fn into_operation(self, name: &str) -> (OperationDefinition, BridgeFunction) {
                let definition = OperationDefinition::new(
                    name,
                    vec![$(<$P as SupportedParameterType<$P>>::get_parameter_type()),+],
                    R::get_return_type(),
                );
                let func = BridgeFunction::new(
                    move |inv: &Invocation<'_>, args: Vec<ParameterValue>| {
                        let [$($p),+] = <[ParameterValue; $arity]>::try_from(args).map_err(
                            |args| UnexpectedNoOfArguments(inv.name.to_string(), $arity, args.len()),
                        )?;
                        // arguments are converted left to right, so the first
                        // bad one is reported
                        let result = self(
                            inv,
                            $(<$P as SupportedParameterType<$P>>::get_inner($p)?),+
                        )?;
                        Ok(result.get_return_value())
                    },
                );
                (definition, func)
            }
        }
    };
}

impl_operation!(Operation1, 1, p1: P1);
impl_operation!(Operation2, 2, p1: P1, p2: P2);
impl_operation!(Operation3, 3, p1: P1, p2: P2, p3: P3);
impl_operation!(Operation4, 4, p1: P1, p2: P2, p3: P3, p4: P4);

#[cfg(test)]
mod tests {
    use std::os::raw::{c_int, c_uint};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{Operation2, Operation3};
    use crate::config::BridgeConfiguration;
    use crate::func::types::{ParameterType, ParameterValue, ReturnType, ReturnValue};
    use crate::func::Invocation;
    use crate::handle::context::Context;
    use crate::testing::{CountingLock, MallocApi};
    use crate::{BridgeError, Result};

    fn with_invocation<T>(f: impl FnOnce(&Invocation<'_>) -> T) -> T {
        let ctx = Context::default();
        let api = MallocApi::default();
        let lock = CountingLock::default();
        let config = BridgeConfiguration::default();
        let inv = Invocation {
            name: "add",
            ctx: &ctx,
            api: &api,
            lock: &lock,
            config: &config,
        };
        f(&inv)
    }

    #[test]
    fn definition_describes_the_format() {
        let add = |_: &Invocation<'_>, a: c_int, b: c_uint| -> Result<i32> { Ok(a + b as i32) };
        let (def, _) = Operation2::into_operation(add, "add");
        assert_eq!(def.parameter_types, vec![ParameterType::Int, ParameterType::UInt]);
        assert_eq!(def.return_type, ReturnType::Int);
        assert_eq!(def.arity(), 2);
        assert_eq!(def.to_string(), "add(int, unsigned int) -> int");
    }

    #[test]
    fn well_typed_call_reaches_the_operation() {
        let add = |_: &Invocation<'_>, a: c_int, b: c_uint| -> Result<i32> { Ok(a + b as i32) };
        let (_, func) = Operation2::into_operation(add, "add");
        let ret = with_invocation(|inv| {
            func.call(inv, vec![ParameterValue::Int(2), ParameterValue::Int(3)])
        });
        assert_eq!(ret.unwrap(), ReturnValue::Int(5));
    }

    #[test]
    fn wrong_arity_never_calls_the_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let op = move |_: &Invocation<'_>, a: c_int, _b: c_int, _c: c_int| -> Result<i32> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(a)
        };
        let (_, func) = Operation3::into_operation(op, "add");
        let err = with_invocation(|inv| {
            func.call(inv, vec![ParameterValue::Int(2), ParameterValue::Int(3)])
        })
        .unwrap_err();
        assert!(matches!(err, BridgeError::UnexpectedNoOfArguments(_, 3, 2)));
        assert_eq!(err.to_string(), "add() takes exactly 3 arguments (2 given)");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn wrong_type_never_calls_the_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let op = move |_: &Invocation<'_>, a: c_int, _b: c_uint| -> Result<i32> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(a)
        };
        let (_, func) = Operation2::into_operation(op, "add");
        let err = with_invocation(|inv| {
            func.call(
                inv,
                vec![ParameterValue::Int(1), ParameterValue::String("x".into())],
            )
        })
        .unwrap_err();
        assert!(err.is_usage_error());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
