use rand::random;

use self::hdl::Hdl;

/// Storage for the native objects that interpreter-level handles refer to
pub mod context;
/// Conversion between `Handle` and the `Hdl` type, which is a more
/// Rust-friendly representation of a `Handle`.
pub mod hdl;
/// Mapping an object reference to the native domain it wraps
pub mod resolve;

/// An opaque, interpreter-level reference to an object stored in a
/// `Context`.
///
/// The left 32 bits hold the `TypeID` of the referenced object and the
/// right 32 bits hold its `Key`:
///
/// ```text
/// { 32 bits for the type ID }{ 32 bits for the key }
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle(pub u64);

/// The ID of the type of the object a `Handle` refers to.
pub type TypeID = u32;
/// The key used to store an object inside a `Context`.
pub type Key = u32;

/// The `Key` of a handle that points to nothing.
pub(crate) const EMPTY_KEY: Key = 0;

/// The `Key` of a handle that is guaranteed never to reference any object
/// in any `Context`.
pub(crate) const INVALID_KEY: Key = 1;

/// Create and return a new random `Key` that is not one of the reserved
/// keys.
pub(crate) fn new_key() -> Key {
    loop {
        let r: Key = random();
        if r != EMPTY_KEY && r != INVALID_KEY {
            return r;
        }
    }
}

impl From<Hdl> for Handle {
    fn from(hdl: Hdl) -> Self {
        let type_id_shifted = (hdl.type_id() as u64) << 32;
        let key_u64 = hdl.key() as u64;
        Handle(type_id_shifted | key_u64)
    }
}

impl Handle {
    /// Create a new empty `Handle`, which is not stored in any `Context`.
    pub fn new_empty() -> Handle {
        Handle::from(Hdl::Empty())
    }

    /// Return a new `Handle` that is invalid and guaranteed not to
    /// reference any object inside any `Context`.
    pub fn new_invalid() -> Handle {
        Handle::from(Hdl::Invalid())
    }

    /// Get the key portion of `self`.
    pub fn key(&self) -> Key {
        // truncating to 32 bits drops the type ID
        (self.0 & u32::MAX as u64) as Key
    }

    /// Get the `TypeID` portion of `self`.
    pub fn type_id(&self) -> TypeID {
        (self.0 >> 32) as TypeID
    }
}
