//! Search evaluation over the in-memory tree.
//!
//! There are no indexes: every non-base search is a linear scan over
//! `entries` with scope and filter predicates applied per entry.

use super::storage::{self, TreeInner};
use crate::{
    backend::{SearchScope, errors::BackendError},
    dn::Dn,
    entry::Entry,
    filter::Filter,
};

/// Runs a search, invoking `visit` with a deep copy of every match.
pub(crate) fn search(
    inner: &TreeInner,
    base: &Dn,
    scope: SearchScope,
    filter: &Filter,
    visit: &mut dyn FnMut(Entry),
) -> Result<(), BackendError> {
    let Some(base_entry) = inner.entries.get(base) else {
        return Err(storage::no_such_object(inner, base));
    };

    match scope {
        SearchScope::BaseObject => {
            if filter.matches(base_entry) {
                visit(base_entry.clone());
            }
        }
        _ => {
            for (dn, entry) in &inner.entries {
                if scope.includes(base, dn) && filter.matches(entry) {
                    visit(entry.clone());
                }
            }
        }
    }
    Ok(())
}
