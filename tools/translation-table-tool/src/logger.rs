//! # Console Logger
//!
//! Routes `log` records to stderr. Progress lines (`info`) are printed as-is;
//! they carry their own right-aligned status label, e.g. `  Generating ...`.
//! Everything else is prefixed as `[LEVEL] target: message`.

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fmt;
use std::io::Write;

/// Width of the right-aligned status label in front of progress lines.
pub const STATUS_WIDTH: usize = 12;

/// A right-aligned status label, e.g. `  Generating`.
#[derive(Copy, Clone, Debug)]
pub struct Status(pub &'static str);

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>STATUS_WIDTH$}", self.0)
    }
}

pub struct ToolLogger {
    max_level: LevelFilter,
}

impl ToolLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Install as the global logger.
    ///
    /// # Errors
    /// If a logger has already been installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_logger(Box::leak(Box::new(self)))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for ToolLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut err = std::io::stderr().lock();
        // Nothing sensible to do if stderr is gone.
        let _ = if record.level() == Level::Info {
            writeln!(err, "{}", record.args())
        } else {
            writeln!(
                err,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        };
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
