use std::io::{self, Write};

use colored::Colorize;
use supports_color::Stream;

/// Writes change lines to stdout, colouring the label when the terminal can
/// show it.
pub fn print_changes(changes: &[String]) -> io::Result<()> {
    let use_color = supports_color::on(Stream::Stdout).is_some();
    let mut stdout = io::stdout().lock();
    for change in changes {
        writeln!(stdout, "{}", paint(change, use_color))?;
    }
    stdout.flush()
}

fn paint(change: &str, use_color: bool) -> String {
    let Some((label, rest)) = change.split_once(':') else {
        return change.to_owned();
    };
    if !use_color {
        return change.to_owned();
    }

    let label = format!("{label}:");
    let label = match label.as_str() {
        "Added:" => label.green(),
        "Removed:" => label.red(),
        "Changed:" => label.yellow(),
        _ => return change.to_owned(),
    };
    format!("{label}{rest}")
}
