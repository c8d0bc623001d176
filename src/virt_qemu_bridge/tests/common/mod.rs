#![allow(dead_code)]

use std::sync::Arc;

use virt_qemu_bridge::func::ParameterValue;
use virt_qemu_bridge::{BridgeConfiguration, Context, Handle, ModuleBuilder, QemuModule};
use virt_qemu_testing::{domain, CountingLock, FakeQemu};

/// A module wired to a `FakeQemu` and a `CountingLock`, with one wrapped
/// domain.
pub struct Bridge {
    pub api: Arc<FakeQemu>,
    pub lock: Arc<CountingLock>,
    pub ctx: Context,
    pub module: QemuModule,
    pub dom: Handle,
}

pub fn new_bridge() -> Bridge {
    new_bridge_with(FakeQemu::new(), BridgeConfiguration::default())
}

pub fn new_bridge_with(api: FakeQemu, config: BridgeConfiguration) -> Bridge {
    let api = Arc::new(api);
    let lock = Arc::new(CountingLock::default());
    let module = ModuleBuilder::new(api.clone(), lock.clone())
        .with_config(config)
        .build()
        .unwrap();
    let mut ctx = Context::default();
    let dom = ctx.register_domain(domain(1));
    Bridge {
        api,
        lock,
        ctx,
        module,
        dom,
    }
}

impl Bridge {
    /// The lock bracket was entered and left the same number of times.
    pub fn assert_lock_balanced(&self) {
        assert_eq!(self.lock.releases(), self.lock.reacquires());
        assert!(!self.lock.is_released());
    }
}

pub fn obj(h: Handle) -> ParameterValue {
    ParameterValue::Object(h)
}

pub fn text(s: &str) -> ParameterValue {
    ParameterValue::String(s.to_string())
}

pub fn int(i: i64) -> ParameterValue {
    ParameterValue::Int(i)
}
