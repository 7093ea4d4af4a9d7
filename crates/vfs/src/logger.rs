//! TEAM_478: Console logger.
//!
//! Implements `log::Log` on top of the console's emergency write path, so it
//! works before the scheduler runs and from interrupt context. The console is
//! looked up on every record: once boot swaps the real serial driver in, logs
//! follow it.

use alloc::sync::Arc;
use core::fmt::{self, Write};

use log::{LevelFilter, Metadata, Record};

use crate::device::Console;
use crate::manager::FilesystemManager;
use crate::sync::Once;

/// Global logger instance
static LOGGER: ConsoleLogger = ConsoleLogger::new();

struct ConsoleLogger {
    manager: Once<Arc<FilesystemManager>>,
}

impl ConsoleLogger {
    const fn new() -> Self {
        Self {
            manager: Once::new(),
        }
    }

    fn attach(&self, manager: Arc<FilesystemManager>) {
        self.manager.call_once(|| manager);
    }
}

/// Adapts the console to `fmt::Write` so records are formatted straight to
/// the device, without allocating.
struct ConsoleWriter<'a>(&'a Console);

impl Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.emergency_write(s);
        Ok(())
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        self.manager.is_completed()
    }

    fn log(&self, record: &Record) {
        let Some(manager) = self.manager.get() else {
            return;
        };
        let mut out = ConsoleWriter(manager.console());
        // The console cannot report failure; nothing to do with an error here
        let _ = write!(out, "{}\r\n", record.args());
    }

    fn flush(&self) {}
}

/// Initialize the logger.
///
/// Records go to `manager`'s console. Fails if a logger is already installed.
pub fn init(manager: Arc<FilesystemManager>, max_level: LevelFilter) -> Result<(), log::SetLoggerError> {
    LOGGER.attach(manager);
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}
