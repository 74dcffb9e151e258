//! Standardized CLI output helpers for the hwtopo CLI.
//!
//! Warnings go to stderr so that JSON and YAML documents on stdout stay
//! machine-readable.

use colored::*;

pub const ICON_WARN: &str = "\u{26a0}"; // ⚠
pub const ICON_HINT: &str = "\u{00b7}"; // ·

/// Print a warning message to stderr: ⚠ message
pub fn warn(msg: &str) {
    eprintln!("{} {}", ICON_WARN.yellow(), msg);
}

/// Print a dimmed hint: · message
pub fn hint(msg: &str) {
    println!("  {} {}", ICON_HINT.dimmed(), msg.dimmed());
}

/// Print a bold cyan header
pub fn header(msg: &str) {
    println!("{}", msg.cyan().bold());
}

/// Print an empty-state message with an optional tip
pub fn empty(msg: &str, tip: Option<&str>) {
    println!("{}", msg.yellow());
    if let Some(t) = tip {
        hint(t);
    }
}

/// Print a dimmed `Label: value` detail line under a device
pub fn detail(label: &str, value: &str) {
    println!("      {} {}", format!("{}:", label).dimmed(), value);
}
