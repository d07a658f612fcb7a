//! Console output for the machine core
//!
//! Backs the `log` facade with a bounded in-memory line buffer so a
//! monitoring front-end can show recent kernel messages. Lines longer than
//! [`LINE_CAPACITY`] are truncated; once [`HISTORY_LINES`] lines are retained
//! the oldest is dropped.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record};
use spin::{Mutex, Once};

/// Maximum characters kept per line
pub const LINE_CAPACITY: usize = 128;

/// Number of lines retained
pub const HISTORY_LINES: usize = 64;

/// A single retained console line
pub type ConsoleLine = heapless::String<LINE_CAPACITY>;

/// Bounded line history
pub struct Console {
    lines: heapless::Deque<ConsoleLine, HISTORY_LINES>,
}

impl Console {
    /// Create an empty console
    pub const fn new() -> Self {
        Console {
            lines: heapless::Deque::new(),
        }
    }

    /// Append formatted text as one line, evicting the oldest when full
    pub fn write_line(&mut self, args: fmt::Arguments) {
        let mut line = ConsoleLine::new();
        let _ = LineWriter { line: &mut line }.write_fmt(args);
        if self.lines.is_full() {
            self.lines.pop_front();
        }
        let _ = self.lines.push_back(line);
    }

    /// Number of retained lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Copy out the retained lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().map(|l| String::from(l.as_str())).collect()
    }

    /// Clear the console
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes into a fixed line, dropping what does not fit
struct LineWriter<'a> {
    line: &'a mut ConsoleLine,
}

impl Write for LineWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            let c = if c == '\n' { ' ' } else { c };
            if self.line.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Global console instance
static CONSOLE: Mutex<Console> = Mutex::new(Console::new());

/// `log` backend writing into the global console
pub struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let target = record.target();
        let target = target.strip_prefix("radiate_core::").unwrap_or(target);
        CONSOLE.lock().write_line(format_args!(
            "[{:<5} {}] {}",
            record.level(),
            target,
            record.args()
        ));
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;
static INSTALLED: Once<bool> = Once::new();

/// Install the console logger and set the maximum level
///
/// Returns false if another logger was already installed by the host.
/// Calling this again only adjusts the level.
pub fn init(level: LevelFilter) -> bool {
    let installed = *INSTALLED.call_once(|| log::set_logger(&LOGGER).is_ok());
    if installed {
        log::set_max_level(level);
    }
    installed
}

/// Print formatted text to the console without going through `log`
pub fn print(args: fmt::Arguments) {
    CONSOLE.lock().write_line(args);
}

/// Recent console lines, oldest first
pub fn recent_lines() -> Vec<String> {
    CONSOLE.lock().lines()
}

/// Clear the console
pub fn clear() {
    CONSOLE.lock().clear();
}
