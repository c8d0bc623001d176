use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, Opts, Registry};
use tracing::error;

use crate::translate::NoResultReason;
use crate::Result;

const NAMESPACE: &str = "virt_qemu";

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static NATIVE_CALLS: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    counter_vec(
        "native_calls",
        "Number of calls made into the native library",
        &["operation"],
    )
});

static NO_RESULT: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    counter_vec(
        "no_result",
        "Number of calls that returned the no-result sentinel",
        &["operation", "reason"],
    )
});

static USAGE_ERRORS: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    counter_vec(
        "usage_errors",
        "Number of calls rejected because of malformed arguments",
        &["operation"],
    )
});

fn new_counter_vec(name: &str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    let counter = IntCounterVec::new(Opts::new(name, help).namespace(NAMESPACE), labels)?;
    REGISTRY.register(Box::new(counter.clone()))?;
    Ok(counter)
}

// A metric that fails to register is logged and then ignored, it never
// fails a call.
fn counter_vec(name: &str, help: &str, labels: &[&str]) -> Option<IntCounterVec> {
    new_counter_vec(name, help, labels)
        .map_err(|e| error!("error registering metric {}: {}", name, e))
        .ok()
}

/// The registry all bridge metrics are registered with, for exporting.
pub fn get_metrics_registry() -> &'static Registry {
    &REGISTRY
}

pub(crate) fn native_call(operation: &str) {
    if let Some(c) = NATIVE_CALLS.as_ref() {
        c.with_label_values(&[operation]).inc();
    }
}

pub(crate) fn no_result(operation: &str, reason: NoResultReason) {
    if let Some(c) = NO_RESULT.as_ref() {
        c.with_label_values(&[operation, reason.into()]).inc();
    }
}

pub(crate) fn usage_error(operation: &str) {
    if let Some(c) = USAGE_ERRORS.as_ref() {
        c.with_label_values(&[operation]).inc();
    }
}

/// Current value of the native call counter for `operation`.
pub fn native_call_count(operation: &str) -> u64 {
    NATIVE_CALLS
        .as_ref()
        .map_or(0, |c| c.with_label_values(&[operation]).get())
}

/// Current value of the no-result counter for `operation` and `reason`.
pub fn no_result_count(operation: &str, reason: NoResultReason) -> u64 {
    NO_RESULT
        .as_ref()
        .map_or(0, |c| c.with_label_values(&[operation, reason.into()]).get())
}

/// Current value of the usage error counter for `operation`.
pub fn usage_error_count(operation: &str) -> u64 {
    USAGE_ERRORS
        .as_ref()
        .map_or(0, |c| c.with_label_values(&[operation]).get())
}
