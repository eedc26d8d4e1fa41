//! Minimal stderr backend for the `log` facade.
//!
//! The level comes from `GHOST_TETRIS_LOG` (`off`, `error`, `warn`, `info`,
//! `debug`, `trace`) and defaults to `info`.

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Parse a level name (case-insensitive)
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    s.trim().parse().ok()
}

pub fn level_from_env() -> LevelFilter {
    std::env::var("GHOST_TETRIS_LOG")
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(LevelFilter::Info)
}

/// Install the stderr logger
///
/// Fails if another logger was installed first.
pub fn init() -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level_from_env());
    Ok(())
}
