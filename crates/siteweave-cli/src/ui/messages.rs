//! Status lines for terminal output.
//!
//! Each line is a glyph followed by the message. Colors follow the stderr
//! setting chosen by [`init_colors`](super::init_colors).

use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    fn glyph(self) -> &'static str {
        match self {
            Level::Success => "✓",
            Level::Info => "ℹ",
            Level::Warning => "⚠",
            Level::Error => "✗",
        }
    }
}

fn status_line(level: Level, message: &str) -> String {
    let glyph = level.glyph();
    if !console::colors_enabled_stderr() {
        return format!("{} {}", glyph, message);
    }

    match level {
        Level::Success => format!("{} {}", glyph.green().bold(), message),
        Level::Info => format!("{} {}", glyph.blue().bold(), message),
        Level::Warning => format!("{} {}", glyph.yellow().bold(), message.yellow()),
        Level::Error => format!("{} {}", glyph.red().bold(), message.red()),
    }
}

/// Print a success line to stderr.
///
/// ```no_run
/// use siteweave_cli::ui::success;
///
/// success("Built 3 pages");
/// ```
pub fn success(message: &str) {
    eprintln!("{}", status_line(Level::Success, message));
}

pub fn info(message: &str) {
    eprintln!("{}", status_line(Level::Info, message));
}

pub fn warning(message: &str) {
    eprintln!("{}", status_line(Level::Warning, message));
}

pub fn error(message: &str) {
    eprintln!("{}", status_line(Level::Error, message));
}
