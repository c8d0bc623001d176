use super::{Handle, Key, TypeID, EMPTY_KEY, INVALID_KEY};
use crate::{BridgeError, Result};

/// The type-safe adapter to `Handle`
#[derive(Eq, Clone, Copy, PartialEq, Debug)]
pub enum Hdl {
    /// A reference to a wrapped native domain.
    Domain(Key),
    /// A reference to nothing.
    ///
    /// Roughly equivalent to `NULL`.
    Empty(),
    /// A reference that never resolves to anything.
    Invalid(),
}

impl Hdl {
    const EMPTY_TYPE_ID: TypeID = 100;
    const INVALID_TYPE_ID: TypeID = 101;
    const DOMAIN_TYPE_ID: TypeID = 102;

    /// Get the `TypeID` associated with `self`.
    pub fn type_id(&self) -> TypeID {
        match self {
            Hdl::Domain(_) => Self::DOMAIN_TYPE_ID,
            Hdl::Empty() => Self::EMPTY_TYPE_ID,
            Hdl::Invalid() => Self::INVALID_TYPE_ID,
        }
    }

    /// Get the `Key` associated with `self`.
    ///
    /// This is useful for inserting, retrieving, and removing
    /// a given `Handle` from a `Context`.
    pub fn key(&self) -> Key {
        match self {
            Hdl::Domain(key) => *key,
            Hdl::Empty() => EMPTY_KEY,
            Hdl::Invalid() => INVALID_KEY,
        }
    }
}

impl std::fmt::Display for Hdl {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Hdl::Domain(key) => write!(f, "Domain({})", key),
            Hdl::Empty() => write!(f, "Empty()"),
            Hdl::Invalid() => write!(f, "Invalid()"),
        }
    }
}

impl TryFrom<Handle> for Hdl {
    type Error = BridgeError;

    /// Create an instance of `Self` from `hdl` if `hdl` represents
    /// a valid `Handle`.
    fn try_from(hdl: Handle) -> Result<Self> {
        let key = hdl.key();
        match hdl.type_id() {
            Self::DOMAIN_TYPE_ID => Ok(Hdl::Domain(key)),
            Self::EMPTY_TYPE_ID => Ok(Hdl::Empty()),
            Self::INVALID_TYPE_ID => Ok(Hdl::Invalid()),
            other => Err(BridgeError::Error(format!("invalid handle type {}", other))),
        }
    }
}
