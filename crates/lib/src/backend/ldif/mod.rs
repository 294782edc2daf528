//! LDIF-backed in-memory backend implementation.
//!
//! The whole directory tree lives in memory behind a single reader-writer
//! lock and is persisted to one LDIF dump file. Read operations take the
//! read side and return deep copies; every mutation takes the write side,
//! updates the tree, and re-emits the dump file through the atomic rewrite
//! protocol before the lock is released, so whenever a mutation reports
//! success the file on disk equals the tree a subsequent reader observes.
//! A failed rewrite is reported as a server error with the in-memory
//! mutation left in place; see the notes on `LdifBackend::persist`.
//!
//! This facade is the only component that acquires the lock; the store
//! operations in the submodules assume the appropriate side is held.

mod config;
mod import;
mod persistence;
mod search;
mod storage;

use std::io::{BufRead, Write};
use std::sync::{Arc, RwLock};

use tracing::debug;

pub use config::LdifBackendConfig;
pub use import::ImportResult;

use storage::TreeInner;

use crate::{
    Result,
    backend::{Backend, HasSubordinates, SearchScope, errors::BackendError},
    dn::Dn,
    entry::Entry,
    filter::Filter,
    ldif::LdifReader,
};

/// An in-memory directory tree backed by a single LDIF dump file.
#[derive(Debug)]
pub struct LdifBackend {
    /// All tree state, guarded as a whole.
    inner: RwLock<TreeInner>,
    /// Replaced as a unit on reconfiguration; readers see either the old
    /// or the new reference, never a partial update.
    config: RwLock<Arc<LdifBackendConfig>>,
}

impl LdifBackend {
    /// Creates a backend with an empty tree. Nothing is read from or
    /// written to disk until the first mutation.
    pub fn new(config: LdifBackendConfig) -> Self {
        LdifBackend {
            inner: RwLock::new(TreeInner::new(config.base_dn().clone())),
            config: RwLock::new(Arc::new(config)),
        }
    }

    /// Creates a backend and populates it from the configured dump file.
    ///
    /// At startup the file is the authoritative source: a missing file
    /// yields an empty tree, and the file is not rewritten by the load.
    pub fn open(config: LdifBackendConfig) -> Result<Self> {
        let backend = Self::new(config);
        {
            let mut inner = backend.inner.write().unwrap();
            let path = backend.config().ldif_file().to_path_buf();
            let result = persistence::load(&mut inner, &path)?;
            debug!(
                read = result.entries_read,
                rejected = result.entries_rejected,
                ignored = result.entries_ignored,
                "loaded dump file {}",
                path.display()
            );
        }
        Ok(backend)
    }

    /// The current configuration reference.
    pub fn config(&self) -> Arc<LdifBackendConfig> {
        self.config.read().unwrap().clone()
    }

    /// Applies a new configuration. The dump file path and the base DN
    /// cannot change on a live backend; that requires a restart.
    pub fn apply_config(&self, new: LdifBackendConfig) -> Result<()> {
        let mut current = self.config.write().unwrap();
        if new.ldif_file() != current.ldif_file() {
            return Err(BackendError::UnwillingToPerform {
                reason: "changing the dump file path requires a backend restart".to_string(),
            }
            .into());
        }
        if new.base_dn() != current.base_dn() {
            return Err(BackendError::UnwillingToPerform {
                reason: "changing the base DN requires a backend restart".to_string(),
            }
            .into());
        }
        *current = Arc::new(new);
        Ok(())
    }

    /// Structural check of both tree indexes (exposed for testing).
    pub fn verify_tree(&self) -> std::result::Result<(), String> {
        storage::verify(&self.inner.read().unwrap())
    }

    fn check_open(inner: &TreeInner) -> std::result::Result<(), BackendError> {
        if inner.closed {
            return Err(BackendError::UnwillingToPerform {
                reason: "the backend has been finalized".to_string(),
            });
        }
        Ok(())
    }

    /// Re-emits the dump file from the current tree. Called with the write
    /// lock held, after the in-memory mutation, so readers never observe a
    /// dump ahead of the tree.
    ///
    /// A failure here is returned to the caller without rolling the
    /// mutation back: the tree keeps the change, the previous dump
    /// survives at `<path>.old`, and the next successful mutation brings
    /// the file back in line with the tree.
    fn persist(&self, inner: &TreeInner) -> std::result::Result<(), BackendError> {
        let config = self.config();
        persistence::rewrite(inner, config.ldif_file())
    }
}

impl Backend for LdifBackend {
    fn base_dn(&self) -> Dn {
        self.inner.read().unwrap().suffix.clone()
    }

    fn entry_count(&self) -> u64 {
        self.inner.read().unwrap().entries.len() as u64
    }

    fn get_entry(&self, dn: &Dn) -> Result<Option<Entry>> {
        let inner = self.inner.read().unwrap();
        Self::check_open(&inner)?;
        Ok(storage::get(&inner, dn))
    }

    fn entry_exists(&self, dn: &Dn) -> Result<bool> {
        let inner = self.inner.read().unwrap();
        Self::check_open(&inner)?;
        Ok(inner.entries.contains_key(dn))
    }

    fn has_subordinates(&self, dn: &Dn) -> Result<HasSubordinates> {
        let inner = self.inner.read().unwrap();
        Self::check_open(&inner)?;
        Ok(storage::has_children(&inner, dn))
    }

    fn num_subordinates(&self, dn: &Dn, subtree: bool) -> Result<u64> {
        let inner = self.inner.read().unwrap();
        Self::check_open(&inner)?;
        Ok(storage::num_subordinates(&inner, dn, subtree)?)
    }

    fn add_entry(&self, entry: Entry) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        Self::check_open(&inner)?;
        storage::add(&mut inner, entry)?;
        self.persist(&inner)?;
        Ok(())
    }

    fn delete_entry(&self, dn: &Dn, subtree_delete: bool) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        Self::check_open(&inner)?;
        let removed = storage::delete(&mut inner, dn, subtree_delete)?;
        debug!(%dn, removed, "deleted");
        self.persist(&inner)?;
        Ok(())
    }

    fn replace_entry(&self, entry: Entry) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        Self::check_open(&inner)?;
        storage::replace(&mut inner, entry)?;
        self.persist(&inner)?;
        Ok(())
    }

    fn rename_entry(&self, current: &Dn, new_entry: Entry, new_superior: bool) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        Self::check_open(&inner)?;
        if !inner.suffix.is_ancestor_or_equal(new_entry.dn()) {
            // A target outside the suffix belongs to some other backend.
            return Err(BackendError::UnwillingToPerform {
                reason: format!(
                    "new DN {} lies outside the {} backend",
                    new_entry.dn(),
                    inner.suffix
                ),
            }
            .into());
        }
        storage::rename(&mut inner, current, new_entry, new_superior)?;
        self.persist(&inner)?;
        Ok(())
    }

    fn search(
        &self,
        base: &Dn,
        scope: SearchScope,
        filter: &Filter,
        visit: &mut dyn FnMut(Entry),
    ) -> Result<()> {
        let inner = self.inner.read().unwrap();
        Self::check_open(&inner)?;
        search::search(&inner, base, scope, filter, visit)?;
        Ok(())
    }

    fn import_ldif(&self, source: &mut dyn BufRead) -> Result<ImportResult> {
        let mut inner = self.inner.write().unwrap();
        Self::check_open(&inner)?;
        let mut reader = LdifReader::new(source);
        let result = import::import(&mut inner, &mut reader)?;
        // Import invoked as an operation re-persists; the startup load in
        // `open` goes through `persistence::load` instead and does not.
        self.persist(&inner)?;
        Ok(result)
    }

    fn export_ldif(&self, sink: &mut dyn Write) -> Result<u64> {
        let inner = self.inner.read().unwrap();
        Self::check_open(&inner)?;
        Ok(persistence::export(&inner, sink)?)
    }

    fn finalize(&self) {
        let mut inner = self.inner.write().unwrap();
        if !inner.closed {
            inner.closed = true;
            debug!(suffix = %inner.suffix, "backend finalized");
        }
    }
}
