//! Core tree-store operations for the LDIF backend.
//!
//! The tree is held in two indexes: `entries` maps every DN to its entry,
//! `children` maps each non-leaf DN to the set of its immediate children.
//! The cross-reference between the two is maintained exclusively through
//! `link_child` / `unlink_child`; no mutation touches one index directly
//! from outside those helpers.
//!
//! `entries` is insertion-ordered, and every code path inserts a parent
//! before any of its children, so iterating `entries` yields an order in
//! which parents precede children. The dump writer and the export path
//! rely on this.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;

use crate::{
    backend::{HasSubordinates, errors::BackendError},
    dn::Dn,
    entry::Entry,
};

/// All mutable state of one backend instance. Guarded as a whole by the
/// facade's single reader-writer lock.
#[derive(Debug)]
pub(crate) struct TreeInner {
    /// The unique root DN of the tree held by this backend.
    pub(crate) suffix: Dn,
    /// DN to entry, insertion-ordered (parents before children).
    pub(crate) entries: IndexMap<Dn, Entry>,
    /// Parent DN to the set of its immediate children. Keys with empty
    /// sets are pruned.
    pub(crate) children: HashMap<Dn, BTreeSet<Dn>>,
    /// Set by finalization; all subsequent operations are refused.
    pub(crate) closed: bool,
}

impl TreeInner {
    pub(crate) fn new(suffix: Dn) -> Self {
        TreeInner {
            suffix,
            entries: IndexMap::new(),
            children: HashMap::new(),
            closed: false,
        }
    }
}

/// The deepest existing ancestor of `dn`, for the matched-DN diagnostic on
/// NO_SUCH_OBJECT results.
pub(crate) fn matched_dn(inner: &TreeInner, dn: &Dn) -> Option<Dn> {
    let mut cursor = dn.parent();
    while let Some(ancestor) = cursor {
        if ancestor.is_root() {
            return None;
        }
        if inner.entries.contains_key(&ancestor) {
            return Some(ancestor);
        }
        cursor = ancestor.parent();
    }
    None
}

pub(crate) fn no_such_object(inner: &TreeInner, dn: &Dn) -> BackendError {
    BackendError::NoSuchObject {
        dn: dn.clone(),
        matched: matched_dn(inner, dn),
    }
}

/// Records `child` in `parent`'s child set, creating the set if absent.
fn link_child(inner: &mut TreeInner, parent: &Dn, child: &Dn) {
    inner
        .children
        .entry(parent.clone())
        .or_default()
        .insert(child.clone());
}

/// Removes `child` from `parent`'s child set. The set is pruned on
/// emptiness only when `prune` is set; rename keeps the set alive for a
/// same-superior move.
fn unlink_child(inner: &mut TreeInner, parent: &Dn, child: &Dn, prune: bool) {
    if let Some(set) = inner.children.get_mut(parent) {
        set.remove(child);
        if prune && set.is_empty() {
            inner.children.remove(parent);
        }
    }
}

/// A deep copy of the entry with the given DN.
pub(crate) fn get(inner: &TreeInner, dn: &Dn) -> Option<Entry> {
    inner.entries.get(dn).cloned()
}

pub(crate) fn has_children(inner: &TreeInner, dn: &Dn) -> HasSubordinates {
    if !inner.entries.contains_key(dn) {
        return HasSubordinates::NoSuchEntry;
    }
    match inner.children.get(dn) {
        Some(set) if !set.is_empty() => HasSubordinates::Yes,
        _ => HasSubordinates::No,
    }
}

/// Immediate child count, or total descendant count with `subtree`.
pub(crate) fn num_subordinates(
    inner: &TreeInner,
    dn: &Dn,
    subtree: bool,
) -> Result<u64, BackendError> {
    if !inner.entries.contains_key(dn) {
        return Err(no_such_object(inner, dn));
    }
    if !subtree {
        return Ok(inner.children.get(dn).map_or(0, |set| set.len() as u64));
    }

    let mut count = 0;
    let mut stack: Vec<&Dn> = match inner.children.get(dn) {
        Some(set) => set.iter().collect(),
        None => return Ok(0),
    };
    while let Some(next) = stack.pop() {
        count += 1;
        if let Some(set) = inner.children.get(next) {
            stack.extend(set.iter());
        }
    }
    Ok(count)
}

pub(crate) fn add(inner: &mut TreeInner, entry: Entry) -> Result<(), BackendError> {
    let dn = entry.dn().clone();
    if inner.entries.contains_key(&dn) {
        return Err(BackendError::EntryAlreadyExists { dn });
    }

    // The suffix bootstraps the tree and has no stored parent.
    if dn == inner.suffix {
        inner.entries.insert(dn, entry);
        return Ok(());
    }

    match dn.parent() {
        Some(parent) if inner.entries.contains_key(&parent) => {
            inner.entries.insert(dn.clone(), entry);
            link_child(inner, &parent, &dn);
            Ok(())
        }
        _ => Err(no_such_object(inner, &dn)),
    }
}

/// Removes `dn`, and with `allow_subtree` its whole subtree. Returns the
/// number of entries removed.
pub(crate) fn delete(
    inner: &mut TreeInner,
    dn: &Dn,
    allow_subtree: bool,
) -> Result<u64, BackendError> {
    if !inner.entries.contains_key(dn) {
        return Err(no_such_object(inner, dn));
    }
    let has_kids = inner.children.get(dn).is_some_and(|set| !set.is_empty());
    if has_kids && !allow_subtree {
        return Err(BackendError::NotAllowedOnNonLeaf { dn: dn.clone() });
    }

    let mut removed = 0;
    if has_kids {
        removed += delete_descendants(inner, dn);
    }
    inner.entries.shift_remove(dn);
    inner.children.remove(dn);
    removed += 1;

    if *dn != inner.suffix
        && let Some(parent) = dn.parent()
    {
        unlink_child(inner, &parent, dn, true);
    }
    Ok(removed)
}

/// Depth-first removal of everything below `base` (exclusive) from both
/// indexes.
fn delete_descendants(inner: &mut TreeInner, base: &Dn) -> u64 {
    let Some(kids) = inner.children.remove(base) else {
        return 0;
    };
    let mut removed = 0;
    for child in kids {
        removed += delete_descendants(inner, &child);
        inner.entries.shift_remove(&child);
        removed += 1;
    }
    removed
}

/// Swaps in a new revision of an existing entry, keyed by its DN. The
/// entry keeps its position in the insertion order.
pub(crate) fn replace(inner: &mut TreeInner, entry: Entry) -> Result<(), BackendError> {
    if !inner.entries.contains_key(entry.dn()) {
        return Err(no_such_object(inner, entry.dn()));
    }
    inner.entries.insert(entry.dn().clone(), entry);
    Ok(())
}

/// Moves the entry at `current` to `new_entry.dn()`, re-keying every
/// descendant so the subtree re-roots under the new DN.
pub(crate) fn rename(
    inner: &mut TreeInner,
    current: &Dn,
    new_entry: Entry,
    new_superior: bool,
) -> Result<(), BackendError> {
    if !inner.entries.contains_key(current) {
        return Err(no_such_object(inner, current));
    }
    let new_dn = new_entry.dn().clone();
    if inner.entries.contains_key(&new_dn) {
        return Err(BackendError::EntryAlreadyExists { dn: new_dn });
    }
    let new_parent = match new_dn.parent() {
        Some(parent) if inner.entries.contains_key(&parent) => parent,
        _ => return Err(no_such_object(inner, &new_dn)),
    };

    // Detach from the old parent. The old child set is pruned on emptiness
    // only when the request named a new superior; a same-superior rename
    // re-populates the same set below.
    if let Some(old_parent) = current.parent() {
        unlink_child(inner, &old_parent, current, new_superior);
    }
    link_child(inner, &new_parent, &new_dn);

    inner.entries.shift_remove(current);
    inner.entries.insert(new_dn.clone(), new_entry);

    rekey_subtree(inner, current, &new_dn);
    Ok(())
}

/// Re-keys everything below `old_base` to sit below `new_base`, cloning
/// nothing: entries move between keys with their DN field rewritten.
/// Pre-order, so the insertion-order invariant is preserved.
fn rekey_subtree(inner: &mut TreeInner, old_base: &Dn, new_base: &Dn) {
    let Some(kids) = inner.children.remove(old_base) else {
        return;
    };
    let mut moved = BTreeSet::new();
    for old_child in kids {
        let new_child = old_child
            .rebase(old_base, new_base)
            .expect("child set members are subordinate to their parent");
        if let Some(mut entry) = inner.entries.shift_remove(&old_child) {
            entry.set_dn(new_child.clone());
            inner.entries.insert(new_child.clone(), entry);
        }
        moved.insert(new_child.clone());
        rekey_subtree(inner, &old_child, &new_child);
    }
    inner.children.insert(new_base.clone(), moved);
}

/// Empties both indexes. Used by the import loader before inserting the
/// new tree.
pub(crate) fn clear(inner: &mut TreeInner) {
    inner.entries.clear();
    inner.children.clear();
}

/// Full structural check of the two indexes (exposed for testing via
/// `LdifBackend::verify_tree`).
pub(crate) fn verify(inner: &TreeInner) -> Result<(), String> {
    if !inner.entries.is_empty() && !inner.entries.contains_key(&inner.suffix) {
        return Err(format!(
            "tree is non-empty but suffix {} is absent",
            inner.suffix
        ));
    }
    for (index, (dn, entry)) in inner.entries.iter().enumerate() {
        if entry.dn() != dn {
            return Err(format!("entry keyed {} carries dn {}", dn, entry.dn()));
        }
        if !inner.suffix.is_ancestor_or_equal(dn) {
            return Err(format!("entry {dn} lies outside suffix {}", inner.suffix));
        }
        if dn == &inner.suffix {
            continue;
        }
        let Some(parent) = dn.parent() else {
            return Err(format!("non-suffix entry {dn} has no parent"));
        };
        let Some(parent_index) = inner.entries.get_index_of(&parent) else {
            return Err(format!("entry {dn} has no stored parent {parent}"));
        };
        if parent_index >= index {
            return Err(format!("entry {dn} precedes its parent {parent}"));
        }
        if !inner
            .children
            .get(&parent)
            .is_some_and(|set| set.contains(dn))
        {
            return Err(format!("entry {dn} missing from child set of {parent}"));
        }
    }
    for (parent, set) in &inner.children {
        if set.is_empty() {
            return Err(format!("empty child set retained for {parent}"));
        }
        if !inner.entries.contains_key(parent) {
            return Err(format!("child set keyed by unknown entry {parent}"));
        }
        for child in set {
            if child.parent().as_ref() != Some(parent) {
                return Err(format!("{child} listed as child of {parent}"));
            }
            if !inner.entries.contains_key(child) {
                return Err(format!("child set of {parent} lists unknown entry {child}"));
            }
        }
    }
    Ok(())
}
