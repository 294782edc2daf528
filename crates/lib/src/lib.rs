//!
//! ldifdb: an in-memory, LDIF-backed directory tree storage engine.
//!
//! The engine keeps a full directory information tree resident in memory,
//! persists it to a single LDIF dump file, and rewrites that file atomically
//! on every mutation. It is designed to sit behind a directory server's
//! pluggable backend interface.
//!
//! ## Core Concepts
//!
//! * **DNs (`Dn`)**: hierarchical distinguished names identifying entries.
//!   Comparison is case-insensitive per LDAP rules.
//! * **Entries (`Entry`)**: a DN plus an attribute multimap. Entries are
//!   value types; the store only ever hands out deep copies.
//! * **Backends (`backend::Backend`)**: the pluggable storage interface the
//!   surrounding server consumes. `backend::LdifBackend` is the LDIF-backed
//!   implementation provided by this crate.
//! * **LDIF codec (`ldif`)**: streaming reader and writer for the textual
//!   dump format, including base64 values and line wrapping.
//! * **MakeLDIF (`makeldif`)**: a template-driven generator producing sample
//!   entry streams, used to seed a backend. The `makeldif` binary in the
//!   companion crate drives it from the command line.

pub mod backend;
pub mod dn;
pub mod entry;
pub mod filter;
pub mod ldif;
pub mod makeldif;

/// Re-export fundamental types for easier access.
pub use backend::{Backend, LdifBackend, SearchScope};
pub use dn::Dn;
pub use entry::Entry;
pub use filter::Filter;

/// Result type used throughout the ldifdb library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Common error type for the ldifdb library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structured DN parsing errors from the dn module
    #[error(transparent)]
    Dn(dn::DnError),

    /// Structured filter parsing errors from the filter module
    #[error(transparent)]
    Filter(filter::FilterError),

    /// Structured codec errors from the ldif module
    #[error(transparent)]
    Ldif(ldif::LdifError),

    /// Structured backend errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured template errors from the makeldif module
    #[error(transparent)]
    Template(makeldif::TemplateError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Dn(_) => "dn",
            Error::Filter(_) => "filter",
            Error::Ldif(_) => "ldif",
            Error::Backend(_) => "backend",
            Error::Template(_) => "makeldif",
        }
    }

    /// Check if this error indicates the requested entry (or a required
    /// ancestor) does not exist.
    pub fn is_no_such_object(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_no_such_object(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (entry already exists).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_already_exists(),
            _ => false,
        }
    }

    /// Check if this error is an internal server failure (I/O in the dump
    /// writer or codec).
    pub fn is_server_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(backend_err) => backend_err.is_server_error(),
            Error::Ldif(_) => true,
            _ => false,
        }
    }

    /// The matched DN diagnostic, when this error carries one.
    pub fn matched_dn(&self) -> Option<&Dn> {
        match self {
            Error::Backend(backend_err) => backend_err.matched_dn(),
            _ => None,
        }
    }
}
