use std::collections::HashMap;

use uuid::Uuid;

use super::hdl::Hdl;
use super::{new_key, Handle, Key};
use crate::native::RawDomain;
use crate::{BridgeError, Result};

/// Context is the store the interpreter side keeps its wrapped native
/// objects in.
///
/// Interpreter objects refer to entries here through `Handle`s, the rough
/// equivalent of pointers. Looking a handle up never dereferences the
/// native pointer; releasing an entry makes every copy of its handle
/// stale.
///
/// A `Context` is only touched while the interpreter's execution lock is
/// held, so it does no locking of its own.
pub struct Context {
    /// Correlates log output of every call made through this context
    pub correlation_id: String,
    /// All wrapped domains stored in this context
    domains: HashMap<Key, RawDomain>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            domains: HashMap::new(),
        }
    }
}

impl Context {
    /// Create a new key and register the given `obj` in the given
    /// collection `coll`.
    ///
    /// The given `make_handle` creates the `Hdl` for the new key.
    pub fn register<T, HandleFn: FnOnce(Key) -> Hdl>(
        obj: T,
        coll: &mut HashMap<Key, T>,
        make_handle: HandleFn,
    ) -> Handle {
        let mut key = new_key();
        while coll.contains_key(&key) {
            key = new_key();
        }
        let handle = Handle::from(make_handle(key));
        coll.insert(handle.key(), obj);
        handle
    }

    /// Get a type `T` from the given collection `coll` using
    /// `handle.key()` as the index to `coll`.
    ///
    /// The `chk` function will be called with the `Hdl` created
    /// from the given `handle`, and if it returns `false`, an
    /// `Err` will be returned.
    pub fn get<T, ChkFn: FnOnce(&Hdl) -> bool>(
        handle: Handle,
        coll: &HashMap<Key, T>,
        chk: ChkFn,
    ) -> Result<&T> {
        let hdl = Hdl::try_from(handle)?;
        if !chk(&hdl) {
            return Err(BridgeError::Error(format!("invalid handle {}", hdl)));
        }
        coll.get(&handle.key()).ok_or_else(|| {
            BridgeError::Error(format!("object {} not found for key {}", hdl, handle.key()))
        })
    }

    /// Wrap a domain pointer handed out by the native library, returning
    /// the object reference the interpreter will pass back in.
    pub fn register_domain(&mut self, domain: RawDomain) -> Handle {
        Self::register(domain, &mut self.domains, Hdl::Domain)
    }

    /// Look up the raw domain stored for `handle`.
    pub fn get_domain(&self, handle: Handle) -> Result<RawDomain> {
        Self::get(handle, &self.domains, |h| matches!(h, Hdl::Domain(_))).copied()
    }

    /// Forget the domain referenced by `handle`, e.g. after the native
    /// library released it. Returns `true` if an entry was removed.
    pub fn release_domain(&mut self, handle: Handle) -> bool {
        match Hdl::try_from(handle) {
            Ok(Hdl::Domain(key)) => self.domains.remove(&key).is_some(),
            _ => false,
        }
    }

    /// The number of domains currently wrapped.
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }
}
