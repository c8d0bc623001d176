use strum::{Display, IntoStaticStr};

use crate::handle::Handle;

/// Interpreter-level values that can be passed to a bridged operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// The interpreter's `None`
    None,
    /// A reference to an interpreter object, such as a wrapped domain
    Object(Handle),
    /// Text
    String(String),
    /// An interpreter integer. Narrowed to the native width during
    /// marshalling.
    Int(i64),
}

/// The element types a format descriptor may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ParameterType {
    /// An object reference, or `None`
    #[strum(serialize = "object")]
    Object,
    /// Text, or `None`
    #[strum(serialize = "str or None")]
    NullableString,
    /// `c_uint`
    #[strum(serialize = "unsigned int")]
    UInt,
    /// `c_int`
    #[strum(serialize = "int")]
    Int,
}

/// Values a bridged operation hands back to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnValue {
    /// The "no result" sentinel
    None,
    /// Text copied out of a native buffer
    String(String),
    /// A native status code
    Int(i32),
}

/// The shapes of value a bridged operation may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum ReturnType {
    /// Text, or the "no result" sentinel
    #[default]
    #[strum(serialize = "str or None")]
    OptionalString,
    /// `c_int`
    #[strum(serialize = "int")]
    Int,
}

impl From<Option<Handle>> for ParameterValue {
    fn from(value: Option<Handle>) -> Self {
        match value {
            Some(handle) => ParameterValue::Object(handle),
            None => ParameterValue::None,
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl ParameterValue {
    /// The interpreter-facing name of this value's type, used in usage
    /// error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::None => "NoneType",
            ParameterValue::Object(_) => "object",
            ParameterValue::String(_) => "str",
            ParameterValue::Int(_) => "int",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ParameterType, ParameterValue, ReturnType};
    use crate::handle::Handle;

    #[test]
    fn descriptor_names() {
        assert_eq!(ParameterType::NullableString.to_string(), "str or None");
        assert_eq!(ParameterType::UInt.to_string(), "unsigned int");
        let name: &'static str = ParameterType::Object.into();
        assert_eq!(name, "object");
        assert_eq!(ReturnType::default(), ReturnType::OptionalString);
    }

    #[test]
    fn conversions_into_parameter_values() {
        assert_eq!(ParameterValue::from(None::<Handle>), ParameterValue::None);
        assert_eq!(
            ParameterValue::from(Some(Handle(7))),
            ParameterValue::Object(Handle(7))
        );
        assert_eq!(
            ParameterValue::from("info status"),
            ParameterValue::String("info status".to_string())
        );
        assert_eq!(ParameterValue::from(5i64).type_name(), "int");
    }
}
