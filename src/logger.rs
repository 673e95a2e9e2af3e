//! Minimal stderr logger behind the `log` facade.

use std::io::{self, Write};

use log::{Level, Metadata, Record};

struct Logger {
    level: Level,
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(io::stderr(), "rgrep: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the logger.  Debug mode lowers the threshold from `Info` to
/// `Debug`.
pub fn init(debug: bool) {
    let level = if debug { Level::Debug } else { Level::Info };
    log::set_max_level(level.to_level_filter());
    let logger = Box::new(Logger { level });
    // Keep whichever logger was installed first.
    let _ = log::set_logger(Box::leak(logger));
}
