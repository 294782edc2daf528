//! Backend implementations for ldifdb storage.
//!
//! This module provides the core `Backend` trait and the LDIF-backed
//! implementation. The trait defines the LDAP-shaped operations the
//! surrounding server core invokes, keeping it independent of the specific
//! storage mechanism. Implementations own their locking: every trait method
//! acquires whatever synchronization it needs internally and returns deep
//! copies, so results remain valid after the call returns.

use std::io::{BufRead, Write};
use std::path::Path;

use crate::{Result, dn::Dn, entry::Entry, filter::Filter};

pub mod errors;
pub mod ldif;

// Re-export main types for easier access.
pub use errors::BackendError;
pub use ldif::{ImportResult, LdifBackend, LdifBackendConfig};

/// OID of the subtree delete request control.
pub const SUBTREE_DELETE_CONTROL_OID: &str = "1.2.840.113556.1.4.805";

/// OID of the "All Operational Attributes" feature.
pub const ALL_OPERATIONAL_ATTRS_FEATURE_OID: &str = "1.3.6.1.4.1.4203.1.5.1";

/// The scope of a search operation relative to its base DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the base entry itself.
    BaseObject,
    /// Only immediate children of the base entry.
    SingleLevel,
    /// The base entry and all of its descendants.
    WholeSubtree,
    /// All descendants of the base entry, excluding the base itself.
    Subordinates,
}

impl SearchScope {
    /// Whether `dn` falls within this scope relative to `base`.
    pub fn includes(&self, base: &Dn, dn: &Dn) -> bool {
        match self {
            SearchScope::BaseObject => dn == base,
            SearchScope::SingleLevel => dn.parent().as_ref() == Some(base),
            SearchScope::WholeSubtree => base.is_ancestor_or_equal(dn),
            SearchScope::Subordinates => base.is_ancestor_of(dn),
        }
    }
}

/// Answer to a "does this entry have children" query.
///
/// A dedicated tri-state rather than a `Result<bool>`: the missing-entry
/// case is an ordinary answer here, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasSubordinates {
    /// The entry exists and has at least one child.
    Yes,
    /// The entry exists and has no children.
    No,
    /// The entry is not present in the tree.
    NoSuchEntry,
}

/// Backend trait abstracting the storage engine behind the server core.
///
/// All implementations must be `Send + Sync`; the server invokes these
/// operations from many threads concurrently. Entries crossing this
/// boundary are always independent deep copies.
///
/// Mutations (`add_entry`, `delete_entry`, `replace_entry`,
/// `rename_entry`, `import_ldif`) persist the tree before returning. A
/// persistence failure surfaces as `BackendError::ServerError` with the
/// in-memory change already applied: the tree is not rolled back, and
/// the backing store re-converges with it on the next successful
/// mutation.
pub trait Backend: Send + Sync {
    /// The single base DN (suffix) this backend holds.
    fn base_dn(&self) -> Dn;

    /// Total number of entries currently in the tree.
    fn entry_count(&self) -> u64;

    /// Retrieves a copy of the entry with the given DN, or `None`.
    fn get_entry(&self, dn: &Dn) -> Result<Option<Entry>>;

    /// Whether an entry with the given DN exists.
    fn entry_exists(&self, dn: &Dn) -> Result<bool>;

    /// Whether the entry has immediate children.
    fn has_subordinates(&self, dn: &Dn) -> Result<HasSubordinates>;

    /// Number of immediate children (`subtree = false`) or of all
    /// descendants (`subtree = true`) of the entry.
    ///
    /// # Errors
    /// `BackendError::NoSuchObject` if the entry does not exist.
    fn num_subordinates(&self, dn: &Dn, subtree: bool) -> Result<u64>;

    /// Adds a new entry.
    ///
    /// # Errors
    /// - `BackendError::EntryAlreadyExists` if the DN is present.
    /// - `BackendError::NoSuchObject` (with matched DN) if the parent is
    ///   absent and the DN is not this backend's suffix.
    fn add_entry(&self, entry: Entry) -> Result<()>;

    /// Deletes an entry. With `subtree_delete` (the subtree delete request
    /// control) a non-leaf entry is removed together with all descendants;
    /// without it, deleting a non-leaf fails.
    ///
    /// # Errors
    /// - `BackendError::NoSuchObject` if the entry does not exist.
    /// - `BackendError::NotAllowedOnNonLeaf` for a non-leaf without the
    ///   control.
    fn delete_entry(&self, dn: &Dn, subtree_delete: bool) -> Result<()>;

    /// Replaces an existing entry with a new revision carrying the same DN.
    ///
    /// # Errors
    /// `BackendError::NoSuchObject` if no entry with that DN exists.
    fn replace_entry(&self, entry: Entry) -> Result<()>;

    /// Renames an entry (modify-DN). `new_entry` carries the new DN and the
    /// already-updated attributes; `new_superior` records whether the
    /// request named a new superior entry. Descendants of `current` are
    /// re-keyed underneath the new DN.
    ///
    /// # Errors
    /// - `BackendError::NoSuchObject` if `current` or the new parent is
    ///   absent.
    /// - `BackendError::EntryAlreadyExists` if the new DN is taken.
    /// - `BackendError::UnwillingToPerform` if the new DN falls outside
    ///   this backend.
    fn rename_entry(&self, current: &Dn, new_entry: Entry, new_superior: bool) -> Result<()>;

    /// Runs a search, invoking `visit` for every matching entry (a deep
    /// copy). Iteration order is unspecified.
    ///
    /// # Errors
    /// `BackendError::NoSuchObject` (with matched DN) if the base entry is
    /// absent.
    fn search(
        &self,
        base: &Dn,
        scope: SearchScope,
        filter: &Filter,
        visit: &mut dyn FnMut(Entry),
    ) -> Result<()>;

    /// Replaces the whole tree with the records read from `source`,
    /// applying the loader's rejection rules, then persists the result.
    fn import_ldif(&self, source: &mut dyn BufRead) -> Result<ImportResult>;

    /// Writes every entry to `sink` in parent-before-child order. Returns
    /// the number of records written.
    fn export_ldif(&self, sink: &mut dyn Write) -> Result<u64>;

    /// Request control OIDs this backend honors.
    fn supported_controls(&self) -> &'static [&'static str] {
        &[SUBTREE_DELETE_CONTROL_OID]
    }

    /// Feature OIDs this backend advertises.
    fn supported_features(&self) -> &'static [&'static str] {
        &[ALL_OPERATIONAL_ATTRS_FEATURE_OID]
    }

    /// Creates a backup of the backend contents.
    ///
    /// The default implementation refuses: dump-file engines are backed up
    /// by copying the dump file externally.
    fn create_backup(&self, _target: &Path) -> Result<()> {
        Err(BackendError::UnwillingToPerform {
            reason: "this backend type does not support backup".to_string(),
        }
        .into())
    }

    /// Restores the backend contents from a backup.
    ///
    /// The default implementation refuses, as for [`Backend::create_backup`].
    fn restore_backup(&self, _source: &Path) -> Result<()> {
        Err(BackendError::UnwillingToPerform {
            reason: "this backend type does not support restore".to_string(),
        }
        .into())
    }

    /// Shuts the backend down. After finalization every operation fails;
    /// callers already holding results keep their copies.
    fn finalize(&self);
}
