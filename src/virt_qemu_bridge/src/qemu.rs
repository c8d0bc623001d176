use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;

use bitflags::bitflags;
use tracing::{debug, info_span, trace};

use crate::func::Invocation;
use crate::guard::allow_threads;
use crate::handle::resolve::resolve_domain;
use crate::handle::Handle;
use crate::metrics;
use crate::translate::{self, NoResultReason, Translated};
use crate::Result;

/// Name of the monitor command operation
pub const MONITOR_COMMAND: &str = "virDomainQemuMonitorCommand";
/// Name of the agent command operation
pub const AGENT_COMMAND: &str = "virDomainQemuAgentCommand";

bitflags! {
    /// Flags accepted by the monitor command.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MonitorCommandFlags: c_uint {
        /// Send the command as QMP
        const DEFAULT = 0;
        /// Send the command in human monitor syntax
        const HMP = 1 << 0;
    }
}

/// How long the agent command waits for the guest agent's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentTimeout {
    /// Wait forever
    Block,
    /// The library's default timeout
    #[default]
    Default,
    /// Do not wait at all
    NoWait,
    /// The timeout used for shutdown-style commands
    Shutdown,
    /// A raw timeout passed to the library unchanged. Construct it with
    /// `AgentTimeout::seconds` to have the special values above mapped to
    /// their named variants.
    Seconds(c_int),
}

impl AgentTimeout {
    const BLOCK: c_int = -2;
    const DEFAULT: c_int = -1;
    const NOWAIT: c_int = 0;
    const SHUTDOWN: c_int = 60;

    /// Wait `secs` seconds. Values that coincide with one of the special
    /// timeouts come back as that variant, so `seconds(60)` is `Shutdown`.
    pub fn seconds(secs: c_int) -> Self {
        Self::from(secs)
    }
}

impl From<AgentTimeout> for c_int {
    fn from(t: AgentTimeout) -> Self {
        match t {
            AgentTimeout::Block => AgentTimeout::BLOCK,
            AgentTimeout::Default => AgentTimeout::DEFAULT,
            AgentTimeout::NoWait => AgentTimeout::NOWAIT,
            AgentTimeout::Shutdown => AgentTimeout::SHUTDOWN,
            AgentTimeout::Seconds(s) => s,
        }
    }
}

impl From<c_int> for AgentTimeout {
    fn from(raw: c_int) -> Self {
        match raw {
            AgentTimeout::BLOCK => AgentTimeout::Block,
            AgentTimeout::DEFAULT => AgentTimeout::Default,
            AgentTimeout::NOWAIT => AgentTimeout::NoWait,
            AgentTimeout::SHUTDOWN => AgentTimeout::Shutdown,
            other => AgentTimeout::Seconds(other),
        }
    }
}

fn command_ptr(cmd: &Option<CString>) -> *const c_char {
    cmd.as_ref().map_or(ptr::null(), |c| c.as_ptr())
}

fn trace_command(inv: &Invocation<'_>, cmd: &Option<CString>) {
    if inv.config.log_commands {
        trace!(
            CorrelationId = inv.ctx.correlation_id,
            Command = ?cmd,
            "sending {}",
            inv.name
        );
    }
}

fn finish(inv: &Invocation<'_>, translated: Translated) -> Option<String> {
    if let Translated::NoResult(reason) = translated {
        debug!(
            CorrelationId = inv.ctx.correlation_id,
            "{} returned no result ({:?})",
            inv.name,
            reason
        );
        metrics::no_result(inv.name, reason);
    }
    translated.into_option()
}

fn unresolved(inv: &Invocation<'_>) -> Option<String> {
    finish(inv, Translated::NoResult(NoResultReason::InvalidHandle))
}

/// Send a command to the domain's QEMU monitor.
///
/// Returns `None` when `domain` does not resolve (the native library is
/// not called) or when the library reports failure with a negative status.
pub fn monitor_command(
    inv: &Invocation<'_>,
    domain: Option<Handle>,
    cmd: Option<CString>,
    flags: c_uint,
) -> Result<Option<String>> {
    let Some(dom) = resolve_domain(inv.ctx, domain) else {
        return Ok(unresolved(inv));
    };
    trace_command(inv, &cmd);

    let mut result: *mut c_char = ptr::null_mut();
    let code = {
        let _span = info_span!("native_call", operation = inv.name).entered();
        metrics::native_call(inv.name);
        allow_threads(inv.lock, || {
            // SAFETY: `dom` was resolved from a live registration, the
            // command is NUL-terminated or null, and `result` outlives the
            // call.
            unsafe { inv.api.qemu_monitor_command(dom, command_ptr(&cmd), &mut result, flags) }
        })
    };

    // SAFETY: on success the library handed `result` over to us.
    let translated = unsafe { translate::from_status_and_out_param(inv.api, code, result) };
    Ok(finish(inv, translated))
}

/// Send a command to the domain's guest agent, waiting up to `timeout`
/// seconds or one of the special `AgentTimeout` values.
///
/// Returns `None` when `domain` does not resolve (the native library is
/// not called) or when the library returns no reply, which covers both
/// failures and timeouts.
pub fn agent_command(
    inv: &Invocation<'_>,
    domain: Option<Handle>,
    cmd: Option<CString>,
    timeout: c_int,
    flags: c_uint,
) -> Result<Option<String>> {
    let Some(dom) = resolve_domain(inv.ctx, domain) else {
        return Ok(unresolved(inv));
    };
    trace_command(inv, &cmd);

    let reply = {
        let _span = info_span!("native_call", operation = inv.name, timeout).entered();
        metrics::native_call(inv.name);
        allow_threads(inv.lock, || {
            // SAFETY: `dom` was resolved from a live registration and the
            // command is NUL-terminated or null.
            unsafe { inv.api.qemu_agent_command(dom, command_ptr(&cmd), timeout, flags) }
        })
    };

    // SAFETY: a non-null reply is handed over to us.
    let translated = unsafe { translate::from_pointer(inv.api, reply) };
    Ok(finish(inv, translated))
}
