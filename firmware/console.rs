/*!
 * `log` backend writing to the board console.
 *
 * The board hands over a function printing formatted text on its UART; each
 * record is printed on its own line with a coloured level prefix.
 */

use core::fmt;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

pub struct ConsoleLogger {
    write: fn(fmt::Arguments),
    level: LevelFilter,
}

impl ConsoleLogger {
    pub const fn new(write: fn(fmt::Arguments), level: LevelFilter) -> ConsoleLogger {
        ConsoleLogger { write, level }
    }

    /// Install as the global logger. Only the first call succeeds.
    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.level);
        Ok(())
    }
}

fn prefix(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31;1mError:\x1b[0m",
        Level::Warn => "\x1b[33;1mWarning:\x1b[0m",
        Level::Info => "\x1b[34;1mInfo:\x1b[0m",
        Level::Debug => "\x1b[1mDebug:\x1b[0m",
        Level::Trace => "Trace:",
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            (self.write)(format_args!("{} {}\n", prefix(record.level()), record.args()));
        }
    }

    fn flush(&self) {}
}
