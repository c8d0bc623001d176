use std::os::raw::c_int;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use virt_qemu_bridge::config::ModuleNaming;
use virt_qemu_bridge::func::{Invocation, Operation2, ReturnType, ReturnValue};
use virt_qemu_bridge::qemu::{AGENT_COMMAND, MONITOR_COMMAND};
use virt_qemu_bridge::{
    BridgeConfiguration, BridgeError, Context, ModuleBuilder, ModuleInit, Result,
};
use virt_qemu_testing::{CountingLock, FakeQemu};

fn builder(api: &Arc<FakeQemu>) -> ModuleBuilder {
    ModuleBuilder::new(api.clone(), Arc::new(CountingLock::default()))
}

#[test]
fn setup_twice_initializes_once() {
    let api = Arc::new(FakeQemu::new());
    let init = ModuleInit::new();

    let first = init.init(|| builder(&api)).expect("first setup");
    let second = init.init(|| builder(&api)).expect("second setup");

    assert!(std::ptr::eq(first, second));
    assert_eq!(api.initialize_calls(), 1);
    assert_eq!(first.operation_names(), vec![AGENT_COMMAND, MONITOR_COMMAND]);
}

#[test]
fn failed_global_initialization_registers_nothing() {
    let failing = Arc::new(FakeQemu::new().with_init_status(-1));
    let init = ModuleInit::new();

    assert!(init.init(|| builder(&failing)).is_none());
    assert!(init.get().is_none());
    assert_eq!(failing.initialize_calls(), 1);

    // a later setup tries again
    let api = Arc::new(FakeQemu::new());
    let module = init.init(|| builder(&api)).expect("retry succeeds");
    assert_eq!(api.initialize_calls(), 1);
    assert!(std::ptr::eq(module, init.get().unwrap()));
}

#[test]
fn build_reports_the_failing_status() {
    let api = Arc::new(FakeQemu::new().with_init_status(-3));
    let err = builder(&api).build().unwrap_err();
    assert!(matches!(err, BridgeError::GlobalInitializationFailed(-3)));
}

#[test]
fn module_name_follows_configuration() {
    let api = Arc::new(FakeQemu::new());
    let config = BridgeConfiguration {
        module_naming: ModuleNaming::Cygwin,
        ..Default::default()
    };
    let module = builder(&api).with_config(config).build().unwrap();
    assert_eq!(module.name(), "cygvirtmod_qemu");

    let module = builder(&api)
        .with_config(BridgeConfiguration {
            module_naming: ModuleNaming::Posix,
            ..Default::default()
        })
        .build()
        .unwrap();
    assert_eq!(module.name(), "libvirtmod_qemu");
}

#[test]
fn extra_operations_go_through_the_marshaller() {
    let api = Arc::new(FakeQemu::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let set_time = move |_: &Invocation<'_>, secs: c_int, flags: u32| -> Result<i32> {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(secs + flags as i32)
    };

    let mut b = builder(&api);
    b.with_operation(|b| Operation2::register(set_time, b, "virDomainQemuSetTime"))
        .unwrap();
    let module = b.build().unwrap();

    let def = module.definition("virDomainQemuSetTime").unwrap();
    assert_eq!(def.return_type, ReturnType::Int);
    assert_eq!(def.to_string(), "virDomainQemuSetTime(int, unsigned int) -> int");

    let ctx = Context::default();
    let ret = module
        .call(&ctx, "virDomainQemuSetTime", vec![40i64.into(), 2i64.into()])
        .unwrap();
    assert_eq!(ret, ReturnValue::Int(42));

    let err = module
        .call(&ctx, "virDomainQemuSetTime", vec![40i64.into()])
        .unwrap_err();
    assert!(err.is_usage_error());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn extra_operation_cannot_shadow_a_command() {
    let api = Arc::new(FakeQemu::new());
    let noop = |_: &Invocation<'_>, a: c_int, _b: c_int| -> Result<i32> { Ok(a) };

    let mut b = builder(&api);
    b.with_operation(|b| Operation2::register(noop, b, AGENT_COMMAND))
        .unwrap();
    let err = b.build().unwrap_err();
    assert!(matches!(err, BridgeError::DuplicateOperation(name) if name == AGENT_COMMAND));
    assert_eq!(api.initialize_calls(), 0);
}
