//! This crate bridges an interpreter to the QEMU-specific entry points of
//! the libvirt virtualization library. Each bridged call resolves the
//! interpreter's object reference to a native domain, marshals the
//! arguments, releases the interpreter's execution lock around the
//! blocking native call and turns the native result back into an
//! interpreter value.

#[deny(dead_code, missing_docs, unused_mut)]
/// Configuration of a bridge module
pub mod config;
#[deny(dead_code, missing_docs, unused_mut)]
/// Dealing with errors raised before and during bridged calls
pub(crate) mod error;
/// Value types, marshalling and arity-specific operation prototypes.
#[deny(dead_code, missing_docs, unused_mut)]
pub mod func;
/// Releasing the interpreter's execution lock around blocking native calls
#[deny(dead_code, missing_docs, unused_mut)]
pub mod guard;
/// Interpreter-level object references and their resolution to native
/// domains
#[deny(dead_code, missing_docs, unused_mut)]
pub mod handle;
/// Prometheus counters for bridged calls
#[deny(missing_docs, unused_mut)]
pub mod metrics;
/// Registration and one-time initialization of the module
#[deny(dead_code, missing_docs, unused_mut)]
pub mod module;
/// The seam to the wrapped native library
#[deny(missing_docs, unused_mut)]
pub mod native;
/// The QEMU monitor and guest agent operations
#[deny(dead_code, missing_docs, unused_mut)]
pub mod qemu;
/// Turning native results into interpreter values
#[deny(dead_code, missing_docs, unused_mut)]
pub mod translate;
/// Fakes for unit tests
#[cfg(test)]
pub(crate) mod testing;

/// The re-export for the `BridgeError` type
pub use error::BridgeError;
/// The re-export for the `BridgeConfiguration` type
pub use config::BridgeConfiguration;
/// Re-export for the `ExecutionLock` trait
pub use guard::ExecutionLock;
/// The re-export for the `InterpreterLock` type
pub use guard::InterpreterLock;
/// The re-export for the `Context` type
pub use handle::context::Context;
/// The re-export for the `Handle` type
pub use handle::Handle;
/// Re-export for the `ModuleBuilder` type
pub use module::ModuleBuilder;
/// Re-export for the `ModuleInit` type
pub use module::ModuleInit;
/// Re-export for the `QemuModule` type
pub use module::QemuModule;
/// The re-export for the process-wide module slot
pub use module::QEMU_MODULE;
/// Re-export for the `QemuApi` trait
pub use native::QemuApi;
/// The re-export for the `AgentTimeout` type
pub use qemu::AgentTimeout;
/// The re-export for the `MonitorCommandFlags` type
pub use qemu::MonitorCommandFlags;

#[cfg(feature = "libvirt")]
/// The re-export for the libvirt-backed module setup
pub use module::init_libvirtmod_qemu;

/// The universal `Result` type used throughout the bridge
pub type Result<T> = core::result::Result<T, BridgeError>;
