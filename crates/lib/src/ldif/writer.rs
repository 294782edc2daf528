//! LDIF record writer with line wrapping.

use std::io::Write;

use base64ct::{Base64, Encoding};

use super::errors::LdifError;
use crate::entry::Entry;

/// Writes entries as LDIF records.
///
/// Values that are not safe to emit verbatim (non-ASCII, control bytes, a
/// leading space, `:` or `<`, or a trailing space) are base64 encoded on a
/// `type::` line. Logical lines longer than the wrap column are folded with
/// single-space continuation lines; a wrap column of 0 disables folding.
pub struct LdifWriter<W: Write> {
    out: W,
    wrap_column: usize,
    records_written: u64,
}

impl<W: Write> LdifWriter<W> {
    /// Conventional LDIF wrap column.
    pub const DEFAULT_WRAP_COLUMN: usize = 76;

    pub fn new(out: W) -> Self {
        Self::with_wrap_column(out, Self::DEFAULT_WRAP_COLUMN)
    }

    /// `wrap_column = 0` disables wrapping.
    pub fn with_wrap_column(out: W, wrap_column: usize) -> Self {
        LdifWriter {
            out,
            wrap_column,
            records_written: 0,
        }
    }

    /// Writes one entry as a record, preceded by a blank-line separator for
    /// every record after the first.
    pub fn write_entry(&mut self, entry: &Entry) -> Result<(), LdifError> {
        if self.records_written > 0 {
            writeln!(self.out)?;
        }
        self.write_value_line("dn", entry.dn().to_string().as_bytes())?;
        for attr in entry.attributes() {
            for value in &attr.values {
                self.write_value_line(&attr.name, value)?;
            }
        }
        self.records_written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn flush(&mut self) -> Result<(), LdifError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_value_line(&mut self, name: &str, value: &[u8]) -> Result<(), LdifError> {
        let line = if is_safe_value(value) {
            // is_safe_value guarantees pure ASCII.
            format!("{name}: {}", std::str::from_utf8(value).unwrap_or(""))
        } else {
            format!("{name}:: {}", Base64::encode_string(value))
        };
        self.write_wrapped(&line)
    }

    fn write_wrapped(&mut self, line: &str) -> Result<(), LdifError> {
        let wrap = self.wrap_column;
        if wrap == 0 || line.len() <= wrap {
            writeln!(self.out, "{line}")?;
            return Ok(());
        }
        // Wrapped lines are pure ASCII (safe values or base64), so byte
        // slicing cannot split a character.
        let bytes = line.as_bytes();
        self.out.write_all(&bytes[..wrap])?;
        writeln!(self.out)?;
        let mut rest = &bytes[wrap..];
        let chunk = wrap.saturating_sub(1).max(1);
        while !rest.is_empty() {
            let take = chunk.min(rest.len());
            self.out.write_all(b" ")?;
            self.out.write_all(&rest[..take])?;
            writeln!(self.out)?;
            rest = &rest[take..];
        }
        Ok(())
    }
}

/// True when the value can appear verbatim after `type: `.
fn is_safe_value(value: &[u8]) -> bool {
    let Some((&first, _)) = value.split_first() else {
        return true;
    };
    if matches!(first, b' ' | b':' | b'<') {
        return false;
    }
    if value.last() == Some(&b' ') {
        return false;
    }
    value.iter().all(|&b| (0x20..=0x7e).contains(&b))
}
