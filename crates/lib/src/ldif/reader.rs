//! Streaming LDIF record reader.

use std::io::BufRead;

use base64ct::{Base64, Encoding};

use super::errors::LdifError;
use crate::{dn::Dn, entry::Entry};

/// Reads entries from an LDIF stream, one record at a time.
///
/// Blank lines separate records, `#` lines are comments, and a leading
/// single space marks a continuation of the previous logical line. A
/// `version:` line before the first record is tolerated and skipped.
pub struct LdifReader<R: BufRead> {
    input: R,
    line_no: u64,
    peeked: Option<Option<String>>,
    seen_record: bool,
}

impl<R: BufRead> LdifReader<R> {
    pub fn new(input: R) -> Self {
        LdifReader {
            input,
            line_no: 0,
            peeked: None,
            seen_record: false,
        }
    }

    /// Reads the next record, or `None` at end of stream.
    ///
    /// Record-level syntax problems are returned as continuable errors with
    /// the offending record fully consumed, so the caller may call
    /// `read_entry` again to move on to the next record.
    pub fn read_entry(&mut self) -> Result<Option<Entry>, LdifError> {
        loop {
            let Some((start_line, lines)) = self.next_record_lines()? else {
                return Ok(None);
            };

            let mut lines = lines.into_iter();
            let mut first = match lines.next() {
                Some(line) => line,
                None => continue,
            };

            // A version line may precede the first record; it is not part
            // of the record itself.
            if !self.seen_record && first.starts_with("version:") {
                match lines.next() {
                    Some(next) => first = next,
                    None => continue,
                }
            }
            self.seen_record = true;

            let (name, value) = parse_attr_line(&first, start_line)?;
            if !name.eq_ignore_ascii_case("dn") {
                return Err(LdifError::malformed(
                    start_line,
                    format!("record does not start with a dn line: {first}"),
                ));
            }
            let dn_str = String::from_utf8(value).map_err(|_| {
                LdifError::malformed(start_line, "dn value is not valid UTF-8")
            })?;
            let dn = Dn::parse(&dn_str).map_err(|e| {
                LdifError::malformed(start_line, format!("invalid dn \"{dn_str}\": {e}"))
            })?;

            let mut entry = Entry::new(dn);
            for line in lines {
                let (name, value) = parse_attr_line(&line, start_line)?;
                entry.add_value(&name, value);
            }
            return Ok(Some(entry));
        }
    }

    /// Collects the logical lines of the next record, skipping blank and
    /// comment lines between records. Returns the starting line number and
    /// the unfolded lines, or `None` at end of stream.
    fn next_record_lines(&mut self) -> Result<Option<(u64, Vec<String>)>, LdifError> {
        // Skip separators.
        loop {
            match self.peek_line()? {
                None => return Ok(None),
                Some(line) if line.is_empty() || line.starts_with('#') => {
                    self.next_line()?;
                }
                Some(_) => break,
            }
        }

        let start_line = self.line_no + 1;
        let mut lines: Vec<String> = Vec::new();
        loop {
            match self.peek_line()? {
                None => break,
                Some(line) if line.is_empty() => {
                    self.next_line()?;
                    break;
                }
                Some(line) if line.starts_with('#') => {
                    self.next_line()?;
                }
                Some(line) if line.starts_with(' ') => {
                    // Continuation of the previous logical line.
                    let cont = self.next_line()?.unwrap_or_default();
                    match lines.last_mut() {
                        Some(prev) => prev.push_str(&cont[1..]),
                        None => {
                            return Err(LdifError::malformed(
                                self.line_no,
                                "continuation line with nothing to continue",
                            ));
                        }
                    }
                }
                Some(_) => {
                    let line = self.next_line()?.unwrap_or_default();
                    lines.push(line);
                }
            }
        }
        Ok(Some((start_line, lines)))
    }

    fn peek_line(&mut self) -> Result<Option<&str>, LdifError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.read_raw_line()?);
        }
        Ok(self.peeked.as_ref().and_then(|l| l.as_deref()))
    }

    fn next_line(&mut self) -> Result<Option<String>, LdifError> {
        match self.peeked.take() {
            Some(line) => {
                if line.is_some() {
                    self.line_no += 1;
                }
                Ok(line)
            }
            None => {
                let line = self.read_raw_line()?;
                if line.is_some() {
                    self.line_no += 1;
                }
                Ok(line)
            }
        }
    }

    fn read_raw_line(&mut self) -> Result<Option<String>, LdifError> {
        let mut buf = String::new();
        let n = self.input.read_line(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }
}

/// Splits one logical line into attribute description and value bytes,
/// decoding `::` base64 values.
fn parse_attr_line(line: &str, record_line: u64) -> Result<(String, Vec<u8>), LdifError> {
    let Some(colon) = line.find(':') else {
        return Err(LdifError::malformed(
            record_line,
            format!("attribute line has no ':' separator: {line}"),
        ));
    };
    let name = line[..colon].trim();
    if name.is_empty() {
        return Err(LdifError::malformed(
            record_line,
            "attribute line has an empty description",
        ));
    }
    let rest = &line[colon + 1..];

    if let Some(encoded) = rest.strip_prefix(':') {
        let decoded = Base64::decode_vec(encoded.trim()).map_err(|e| {
            LdifError::malformed(record_line, format!("invalid base64 value for {name}: {e}"))
        })?;
        return Ok((name.to_string(), decoded));
    }
    if rest.starts_with('<') {
        return Err(LdifError::malformed(
            record_line,
            format!("URL-valued attribute {name} is not supported"),
        ));
    }
    Ok((name.to_string(), rest.trim().as_bytes().to_vec()))
}
