/*!

Logging setup. The crate logs through the `log` facade; this module wires the facade to a
`log4rs` console appender. Logging is off until [`enable_logging`] or [`set_log_level`] is
called, which is what the `sird` binary does at startup.

Per-module levels can be set with [`set_module_filter`], e.g. to see per-block `trace!` output
from the parallel engine without flooding the console with everything else:

```rust,no_run
use log::LevelFilter;
use sird_grid::log::{set_log_level, set_module_filter};

set_log_level(LevelFilter::Info).unwrap();
set_module_filter("sird_grid::engine::parallel", LevelFilter::Trace).unwrap();
```

*/

use crate::error::SimError;
pub use log::LevelFilter;
use log4rs::{
    Config,
    Handle,
    append::console::ConsoleAppender,
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
};
use rustc_hash::FxHashMap;
use std::sync::{LazyLock, Mutex, MutexGuard};

const DEFAULT_LOG_PATTERN: &str = "{h({l})} {M}: {m}{n}";
const CONSOLE_APPENDER: &str = "stdout";

struct LogConfiguration {
    global_level: LevelFilter,
    module_levels: FxHashMap<String, LevelFilter>,
    // `log4rs` can only be installed once per process; afterwards we reconfigure through this.
    handle: Option<Handle>,
}

impl LogConfiguration {
    fn build_config(&self) -> Result<Config, SimError> {
        let console = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN)))
            .build();

        let mut builder = Config::builder()
            .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console)));
        for (module, level) in &self.module_levels {
            builder = builder.logger(Logger::builder().build(module.as_str(), *level));
        }

        builder
            .build(Root::builder().appender(CONSOLE_APPENDER).build(self.global_level))
            .map_err(|errors| SimError::config(format!("invalid logging configuration: {errors}")))
    }

    fn apply(&mut self) -> Result<(), SimError> {
        let config = self.build_config()?;
        match &self.handle {
            Some(handle) => handle.set_config(config),
            None => {
                let handle = log4rs::init_config(config)
                    .map_err(|e| SimError::config(format!("could not install logger: {e}")))?;
                self.handle = Some(handle);
            }
        }
        Ok(())
    }
}

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(|| {
    Mutex::new(LogConfiguration {
        global_level: LevelFilter::Off,
        module_levels: FxHashMap::default(),
        handle: None,
    })
});

fn configuration() -> MutexGuard<'static, LogConfiguration> {
    // A poisoned lock only means another thread panicked mid-update; the data is still usable.
    LOG_CONFIGURATION
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Turns logging on at `Info`.
pub fn enable_logging() -> Result<(), SimError> {
    set_log_level(LevelFilter::Info)
}

/// Turns logging off. Module filters are kept for the next time logging is enabled.
pub fn disable_logging() -> Result<(), SimError> {
    set_log_level(LevelFilter::Off)
}

/// Sets the level for every module without an explicit filter.
pub fn set_log_level(level: LevelFilter) -> Result<(), SimError> {
    let mut configuration = configuration();
    configuration.global_level = level;
    configuration.apply()
}

/// Sets the level for `module` and its submodules, overriding the global level.
pub fn set_module_filter(module: &str, level: LevelFilter) -> Result<(), SimError> {
    let mut configuration = configuration();
    configuration.module_levels.insert(module.to_string(), level);
    configuration.apply()
}

/// Removes a filter set with [`set_module_filter`].
pub fn remove_module_filter(module: &str) -> Result<(), SimError> {
    let mut configuration = configuration();
    if configuration.module_levels.remove(module).is_some() {
        configuration.apply()?;
    }
    Ok(())
}
