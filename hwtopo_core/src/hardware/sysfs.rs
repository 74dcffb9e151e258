//! Property reading helpers for sysfs device directories.
//!
//! Optional hardware attributes are routinely missing, so single-value reads
//! never fail: an absent file reads as an empty string.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Read a single-value attribute file, trimmed.
///
/// Returns an empty string if the file is absent or unreadable.
pub fn read_attribute(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(_) => String::new(),
    }
}

/// Read `name` inside `dir`, returning `None` when empty or absent
pub fn read_optional(dir: &Path, name: &str) -> Option<String> {
    let value = read_attribute(&dir.join(name));
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Parse a `KEY=value` / `KEY: value` block such as `uevent` or TPM `caps`.
///
/// Keys are upper-cased and both sides are trimmed. When a line contains
/// both separators the first `=` wins, which keeps values like
/// `MODALIAS=usb:v046Ap...` intact. Lines without a separator are skipped.
///
/// Only failing to open or read the file is an error.
pub fn read_key_value_block(path: &Path) -> io::Result<HashMap<String, String>> {
    let file = fs::File::open(path)?;
    let mut props = HashMap::new();

    for line in BufReader::new(file).split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        if let Some((key, value)) = split_property(&line) {
            props.insert(key, value);
        }
    }

    Ok(props)
}

fn split_property(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=').or_else(|| line.split_once(':'))?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_ascii_uppercase(), value.trim().to_string()))
}
