use std::collections::HashMap;
use std::os::raw::c_int;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{error, info, info_span, instrument, trace, Span};

use crate::config::BridgeConfiguration;
use crate::func::operation::{Operation3, Operation4, OperationDefinition};
use crate::func::{
    BridgeFunction, Invocation, ParameterValue, ReturnValue, SupportedParameterType,
    SupportedReturnType,
};
use crate::guard::ExecutionLock;
use crate::handle::context::Context;
use crate::handle::Handle;
use crate::native::QemuApi;
use crate::qemu::{self, AgentTimeout, MonitorCommandFlags, AGENT_COMMAND, MONITOR_COMMAND};
use crate::{log_then_return, metrics, BridgeError, Result};

type FunctionsMap = HashMap<String, (OperationDefinition, BridgeFunction)>;

/// Collects everything a `QemuModule` is made of before the native
/// library is initialized.
pub struct ModuleBuilder {
    api: Arc<dyn QemuApi>,
    lock: Arc<dyn ExecutionLock>,
    config: BridgeConfiguration,
    functions: FunctionsMap,
}

impl ModuleBuilder {
    /// Start a module that calls into `api` and releases `lock` around
    /// blocking native calls.
    pub fn new(api: Arc<dyn QemuApi>, lock: Arc<dyn ExecutionLock>) -> Self {
        Self {
            api,
            lock,
            config: BridgeConfiguration::default(),
            functions: FunctionsMap::new(),
        }
    }

    /// Use `config` instead of the default configuration.
    pub fn with_config(mut self, config: BridgeConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Register an extra operation alongside the QEMU commands, e.g. a
    /// generated stub for another library entry point.
    ///
    /// ```ignore
    /// builder.with_operation(|b| op.register(b, "virDomainQemuAttach"))?;
    /// ```
    pub fn with_operation<F>(&mut self, register: F) -> Result<()>
    where
        F: FnOnce(&mut ModuleBuilder) -> Result<()>,
    {
        register(self)
    }

    /// Add `func` under `definition.name`. Names must be unique.
    pub(crate) fn register_function(
        &mut self,
        definition: OperationDefinition,
        func: BridgeFunction,
    ) -> Result<()> {
        if self.functions.contains_key(&definition.name) {
            log_then_return!(BridgeError::DuplicateOperation(definition.name));
        }
        trace!("registering {}", definition);
        self.functions
            .insert(definition.name.clone(), (definition, func));
        Ok(())
    }

    /// Run the native library's global initialization, then register the
    /// QEMU operations. Nothing is registered if initialization fails, and
    /// an extra operation named like a QEMU operation fails the build
    /// before the library is touched.
    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    pub fn build(mut self) -> Result<QemuModule> {
        for name in [MONITOR_COMMAND, AGENT_COMMAND] {
            if self.functions.contains_key(name) {
                log_then_return!(BridgeError::DuplicateOperation(name.to_string()));
            }
        }
        let status: c_int = self.api.initialize();
        if status < 0 {
            return Err(BridgeError::GlobalInitializationFailed(status));
        }
        Operation3::register(qemu::monitor_command, &mut self, MONITOR_COMMAND)?;
        Operation4::register(qemu::agent_command, &mut self, AGENT_COMMAND)?;

        let name = self.config.module_naming.module_name();
        info!("module {} ready with {} operations", name, self.functions.len());
        Ok(QemuModule {
            name,
            api: self.api,
            lock: self.lock,
            config: self.config,
            functions: self.functions,
        })
    }
}

/// The registered set of bridged operations, callable with interpreter
/// values.
pub struct QemuModule {
    name: &'static str,
    api: Arc<dyn QemuApi>,
    lock: Arc<dyn ExecutionLock>,
    config: BridgeConfiguration,
    functions: FunctionsMap,
}

impl std::fmt::Debug for QemuModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QemuModule")
            .field("name", &self.name)
            .field("operations", &self.operation_names())
            .finish()
    }
}

impl QemuModule {
    /// The name the module is registered under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The names of all registered operations, sorted.
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The definition of the operation registered as `name`.
    pub fn definition(&self, name: &str) -> Option<&OperationDefinition> {
        self.functions.get(name).map(|(d, _)| d)
    }

    /// Call the operation registered as `name` with interpreter values.
    ///
    /// Malformed argument lists are reported as `Err` before any native
    /// state is touched. Native failures and unresolvable handles are not
    /// errors; they come back as `ReturnValue::None`.
    pub fn call(&self, ctx: &Context, name: &str, args: Vec<ParameterValue>) -> Result<ReturnValue> {
        let Some((_, func)) = self.functions.get(name) else {
            log_then_return!(BridgeError::OperationNotFound(name.to_string()));
        };
        let span = info_span!(
            "bridge_call",
            Module = self.name,
            FunctionName = name,
            CorrelationId = ctx.correlation_id
        )
        .entered();
        let inv = Invocation {
            name,
            ctx,
            api: self.api.as_ref(),
            lock: self.lock.as_ref(),
            config: &self.config,
        };
        let res = func.call(&inv, args);
        if let Err(ref e) = res {
            if e.is_usage_error() {
                metrics::usage_error(name);
            }
            error!(
                FunctionName = name,
                CorrelationId = ctx.correlation_id,
                Error = e.to_string()
            );
        }
        span.exit();
        res
    }

    /// Typed entry to the monitor command; goes through the same marshalling
    /// as `call`.
    pub fn monitor_command(
        &self,
        ctx: &Context,
        domain: Option<Handle>,
        cmd: &str,
        flags: MonitorCommandFlags,
    ) -> Result<Option<String>> {
        let ret = self.call(
            ctx,
            MONITOR_COMMAND,
            vec![
                domain.get_parameter_value(),
                ParameterValue::from(cmd),
                flags.bits().get_parameter_value(),
            ],
        )?;
        <Option<String> as SupportedReturnType<Option<String>>>::get_inner(ret)
    }

    /// Typed entry to the agent command; goes through the same marshalling
    /// as `call`.
    pub fn agent_command(
        &self,
        ctx: &Context,
        domain: Option<Handle>,
        cmd: &str,
        timeout: AgentTimeout,
        flags: u32,
    ) -> Result<Option<String>> {
        let ret = self.call(
            ctx,
            AGENT_COMMAND,
            vec![
                domain.get_parameter_value(),
                ParameterValue::from(cmd),
                c_int::from(timeout).get_parameter_value(),
                flags.get_parameter_value(),
            ],
        )?;
        <Option<String> as SupportedReturnType<Option<String>>>::get_inner(ret)
    }
}

/// One-time module setup.
///
/// The first successful `init` initializes the native library and
/// registers the operations; every later call returns the same module
/// without repeating either step. A failed initialization is logged and
/// leaves nothing callable, and a later `init` tries again.
pub struct ModuleInit {
    module: OnceCell<QemuModule>,
}

impl ModuleInit {
    /// An uninitialized module slot.
    pub const fn new() -> Self {
        Self {
            module: OnceCell::new(),
        }
    }

    /// Initialize the module from `make` unless that already happened.
    pub fn init<F>(&self, make: F) -> Option<&QemuModule>
    where
        F: FnOnce() -> ModuleBuilder,
    {
        match self.module.get_or_try_init(|| make().build()) {
            Ok(module) => Some(module),
            Err(e) => {
                error!("module setup aborted: {}", e);
                None
            }
        }
    }

    /// The module, if setup has succeeded.
    pub fn get(&self) -> Option<&QemuModule> {
        self.module.get()
    }
}

impl Default for ModuleInit {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide module slot.
pub static QEMU_MODULE: ModuleInit = ModuleInit::new();

/// Set up the process-wide module against the system libvirt, reading the
/// configuration from the environment.
#[cfg(feature = "libvirt")]
pub fn init_libvirtmod_qemu() -> Option<&'static QemuModule> {
    use crate::guard::InterpreterLock;
    use crate::native::libvirt::LibvirtQemu;

    QEMU_MODULE.init(|| {
        let config = BridgeConfiguration::from_env().unwrap_or_else(|e| {
            error!("{}, using the default configuration", e);
            BridgeConfiguration::default()
        });
        ModuleBuilder::new(Arc::new(LibvirtQemu), InterpreterLock::global()).with_config(config)
    })
}
