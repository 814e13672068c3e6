//! Line-oriented config file format.
//!
//! One entry per line, name and value separated by a single `=`:
//!
//! ```text
//! wifi_ssid=HomeNet
//! wifi_password=secret123
//! boot_count=42
//! ```
//!
//! There is no header, version marker or escaping. A name containing the
//! delimiter, or any field containing a line break, does not survive a
//! save/load cycle.

use std::io::{self, BufRead, BufReader, Read, Write};

use tracing::debug;

use crate::entry::ConfigEntry;
use crate::error::FormatError;

/// Separator between name and value.
pub const DELIMITER: char = '=';

/// Parse a single line into an entry.
///
/// The line is split on the first delimiter, so everything after it
/// belongs to the value. A trailing `\r` is dropped.
pub fn parse_line(line: &str) -> Result<ConfigEntry, FormatError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (name, value) = line
        .split_once(DELIMITER)
        .ok_or(FormatError::MissingDelimiter)?;

    if name.is_empty() {
        return Err(FormatError::EmptyName);
    }

    Ok(ConfigEntry::new(name, value))
}

/// Read every well-formed entry from `reader`, in file order.
///
/// Blank, malformed and non-UTF-8 lines are skipped. If a name appears more
/// than once the later value replaces the earlier one at the earlier
/// position. Only a failing reader is an error.
pub fn read_entries<R: Read>(reader: R) -> io::Result<Vec<ConfigEntry>> {
    let mut entries: Vec<ConfigEntry> = Vec::new();

    for (index, raw) in BufReader::new(reader).split(b'\n').enumerate() {
        let line = match String::from_utf8(raw?) {
            Ok(line) => line,
            Err(_) => {
                debug!(line = index + 1, "Skipping config line with invalid UTF-8");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(entry) => match entries.iter_mut().find(|e| e.name == entry.name) {
                Some(existing) => existing.value = entry.value,
                None => entries.push(entry),
            },
            Err(e) => debug!(line = index + 1, "Skipping malformed config line: {}", e),
        }
    }

    Ok(entries)
}

/// Write `entries` to `writer`, one `name=value` line each.
pub fn write_entries<W: Write>(writer: &mut W, entries: &[ConfigEntry]) -> io::Result<()> {
    for entry in entries {
        writeln!(writer, "{}{}{}", entry.name, DELIMITER, entry.value)?;
    }
    Ok(())
}

/// True when `text` contains a character the file format cannot carry.
pub fn needs_escaping(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

/// True when `name` cannot be reloaded as the same name.
pub fn is_unsafe_name(name: &str) -> bool {
    name.is_empty() || name.contains(DELIMITER) || needs_escaping(name)
}
