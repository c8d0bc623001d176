use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;

/// The process-wide capturing logger.
pub static LOGGER: Logger = Logger {
    log_calls: Mutex::new(Vec::new()),
};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// One recorded `log` call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogCall {
    /// The level it was logged at
    pub level: Level,
    /// The module path or explicit target
    pub target: String,
    /// The formatted message, including any structured fields
    pub message: String,
}

/// Records every `log` record it receives.
pub struct Logger {
    log_calls: Mutex<Vec<LogCall>>,
}

impl Logger {
    /// Install `LOGGER` as the global logger at `Trace` level. Later calls
    /// do nothing. Fails if some other logger was installed first.
    pub fn initialize_test_logger() -> anyhow::Result<()> {
        INSTALLED.get_or_try_init(|| {
            log::set_logger(&LOGGER)?;
            log::set_max_level(LevelFilter::Trace);
            Ok::<(), log::SetLoggerError>(())
        })?;
        Ok(())
    }

    /// The number of calls recorded since the last `clear_log_calls`.
    pub fn num_log_calls(&self) -> usize {
        self.calls().len()
    }

    /// The recorded call at `idx`, if any.
    pub fn get_log_call(&self, idx: usize) -> Option<LogCall> {
        self.calls().get(idx).cloned()
    }

    /// Forget all recorded calls.
    pub fn clear_log_calls(&self) {
        self.calls().clear();
    }

    /// Whether any recorded message contains `needle`.
    pub fn any_message_contains(&self, needle: &str) -> bool {
        self.calls().iter().any(|c| c.message.contains(needle))
    }

    fn calls(&self) -> std::sync::MutexGuard<'_, Vec<LogCall>> {
        self.log_calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Log for Logger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.calls().push(LogCall {
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        });
    }

    fn flush(&self) {}
}
