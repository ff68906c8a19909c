//! Handles all user-facing output for the CLI.
//!
//! Colors follow the terminal: `ColorChoice::Auto` disables them when
//! stdout is not a tty.

use std::io::Write;
use std::path::Path;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::Expression;

/// Pretty-prints a parsed expression under a header naming its file.
pub fn print_expression(file: &Path, expression: &Expression) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
    let _ = writeln!(stdout, "--- {} ---", file.display());
    let _ = stdout.reset();
    let _ = writeln!(stdout, "{:#?}", expression);
}

/// One line per checked file: `ok` or `FAIL`.
pub fn print_status(file: &Path, ok: bool) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let (label, color) = if ok { ("ok", Color::Green) } else { ("FAIL", Color::Red) };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stdout, "{:>4}", label);
    let _ = stdout.reset();
    let _ = writeln!(stdout, " {}", file.display());
}

pub fn print_summary(passed: usize, failed: usize) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let color = if failed == 0 { Color::Green } else { Color::Red };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)));
    let _ = writeln!(stdout, "{} passed, {} failed", passed, failed);
    let _ = stdout.reset();
}
