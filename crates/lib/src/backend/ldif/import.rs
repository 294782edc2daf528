//! Bulk loader for LDIF dumps.
//!
//! The loader replaces the whole in-memory tree: it clears both indexes
//! first, then inserts records in file order. Because a well-formed dump
//! lists parents before children, a single pass suffices; records that
//! violate the rules are rejected individually with a logged warning while
//! the load continues. Only a non-continuable codec error aborts the load,
//! leaving the store cleared.

use std::io::BufRead;

use tracing::warn;

use super::storage::{self, TreeInner};
use crate::ldif::LdifReader;

/// Counters reported by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportResult {
    /// Records successfully parsed from the stream.
    pub entries_read: u64,
    /// Parsed records rejected by the loader rules (duplicate DN, out of
    /// scope, missing parent).
    pub entries_rejected: u64,
    /// Records skipped because of a recoverable parse error.
    pub entries_ignored: u64,
}

/// Replaces the contents of `inner` with the records read from `reader`.
pub(crate) fn import<R: BufRead>(
    inner: &mut TreeInner,
    reader: &mut LdifReader<R>,
) -> Result<ImportResult, crate::Error> {
    storage::clear(inner);
    let mut result = ImportResult::default();

    loop {
        let entry = match reader.read_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) if err.is_continuable() => {
                warn!("skipping unparseable record: {err}");
                result.entries_ignored += 1;
                continue;
            }
            Err(err) => {
                // The stream position is undefined; abandon the load with
                // the store cleared rather than half-populated.
                storage::clear(inner);
                return Err(err.into());
            }
        };
        result.entries_read += 1;

        let dn = entry.dn().clone();
        if inner.entries.contains_key(&dn) {
            warn!(%dn, "rejecting duplicate entry");
            result.entries_rejected += 1;
            continue;
        }
        if dn != inner.suffix && !inner.suffix.is_ancestor_of(&dn) {
            warn!(%dn, suffix = %inner.suffix, "rejecting entry outside the base DN");
            result.entries_rejected += 1;
            continue;
        }
        if let Err(err) = storage::add(inner, entry) {
            warn!(%dn, "rejecting entry without parent: {err}");
            result.entries_rejected += 1;
        }
    }
    Ok(result)
}
