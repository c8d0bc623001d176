use serde::Deserialize;

use crate::Result;

/// Which name the module registers itself under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleNaming {
    /// Pick from the host platform
    #[default]
    Auto,
    /// `libvirtmod_qemu`
    Posix,
    /// `cygvirtmod_qemu`
    Cygwin,
}

impl ModuleNaming {
    /// The registered module name under POSIX naming
    pub const POSIX_MODULE_NAME: &'static str = "libvirtmod_qemu";
    /// The registered module name under Cygwin naming
    pub const CYGWIN_MODULE_NAME: &'static str = "cygvirtmod_qemu";

    /// Resolve to the concrete module name.
    pub fn module_name(&self) -> &'static str {
        match self {
            ModuleNaming::Posix => Self::POSIX_MODULE_NAME,
            ModuleNaming::Cygwin => Self::CYGWIN_MODULE_NAME,
            ModuleNaming::Auto => {
                cfg_if::cfg_if! {
                    if #[cfg(target_os = "cygwin")] {
                        Self::CYGWIN_MODULE_NAME
                    } else {
                        Self::POSIX_MODULE_NAME
                    }
                }
            }
        }
    }
}

/// Configuration of a bridge module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfiguration {
    /// Record command text in trace events. Off by default: agent commands
    /// can carry guest credentials.
    pub log_commands: bool,
    /// The module name variant to register under
    pub module_naming: ModuleNaming,
}

impl BridgeConfiguration {
    /// Prefix of the environment variables read by `from_env`
    pub const ENV_PREFIX: &'static str = "VIRT_QEMU_BRIDGE_";

    /// Read the configuration from `VIRT_QEMU_BRIDGE_*` environment
    /// variables. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Like `from_env`, reading from the given key/value pairs instead.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(Self::ENV_PREFIX).from_iter(vars)?)
    }
}
