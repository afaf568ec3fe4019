//! Forwards `log` records from the core crate to the browser console.

use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::prelude::*;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format_record(record.level(), record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug => web_sys::console::log_1(&line),
            Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

fn format_record(level: Level, target: &str, args: &std::fmt::Arguments) -> String {
    format!("[{level} {target}] {args}")
}

/// Parse a level name such as `"info"` or `"debug"`; `"off"` silences output.
fn parse_level(level: &str) -> Option<LevelFilter> {
    level.trim().parse().ok()
}

/// Route pipeline logs to the browser console at `level`.
///
/// Safe to call more than once; later calls only change the level.
///
/// # Example
///
/// ```typescript
/// init_logging('debug'); // every encode attempt is logged
/// ```
#[wasm_bindgen]
pub fn init_logging(level: &str) -> Result<(), JsValue> {
    let filter = parse_level(level)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown log level: {}", level)))?;
    // Already installed on a repeat call
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(filter);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info"), Some(LevelFilter::Info));
        assert_eq!(parse_level(" DEBUG "), Some(LevelFilter::Debug));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_format_record() {
        let line = format_record(Level::Warn, "engraver_core::encode", &format_args!("{}MB", 31));
        assert_eq!(line, "[WARN engraver_core::encode] 31MB");
    }
}
