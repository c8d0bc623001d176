use tracing::{debug, instrument, Span};

use super::context::Context;
use super::Handle;
use crate::native::DomainPtr;

/// Map an interpreter object reference to the live native domain it wraps.
///
/// Returns `None`, without raising, when `obj` is the interpreter's `None`,
/// is not a domain reference, refers to a domain that has been released,
/// or wraps a null pointer. The native pointer is never dereferenced here.
#[instrument(skip_all, parent = Span::current(), level = "Trace")]
pub fn resolve_domain(ctx: &Context, obj: Option<Handle>) -> Option<DomainPtr> {
    let handle = obj?;
    match ctx.get_domain(handle) {
        Ok(raw) => DomainPtr::new(raw),
        Err(e) => {
            debug!(CorrelationId = ctx.correlation_id, "domain not resolved: {}", e);
            None
        }
    }
}
