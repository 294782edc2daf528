//! Backend error types.
//!
//! These map one-to-one onto the LDAP result codes the surrounding server
//! returns to clients; `result_code()` gives the numeric code.

use thiserror::Error;

use crate::dn::Dn;

/// Errors that can occur during backend operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// The target entry, or an ancestor it requires, does not exist.
    #[error("entry {dn} does not exist")]
    NoSuchObject {
        /// The DN that was requested
        dn: Dn,
        /// The deepest ancestor of `dn` that does exist, if any
        matched: Option<Dn>,
    },

    /// An add or rename collided with an existing entry.
    #[error("entry {dn} already exists")]
    EntryAlreadyExists {
        /// The DN that collided
        dn: Dn,
    },

    /// Delete of a non-leaf entry without the subtree delete control.
    #[error("entry {dn} has subordinate entries and cannot be deleted without the subtree delete control")]
    NotAllowedOnNonLeaf {
        /// The non-leaf DN
        dn: Dn,
    },

    /// The backend refuses the operation (cross-backend rename, backup on
    /// an engine without backup support, operation after finalization).
    #[error("unwilling to perform: {reason}")]
    UnwillingToPerform {
        /// Why the operation was refused
        reason: String,
    },

    /// The supplied configuration is not acceptable.
    #[error("invalid backend configuration: {reason}")]
    InvalidConfiguration {
        /// What was wrong with the configuration
        reason: String,
    },

    /// Internal failure, typically I/O in the dump writer or codec. Raised
    /// as an alert and returned to the caller.
    #[error("server error: {reason}")]
    ServerError {
        /// Description of the failure
        reason: String,
        /// The underlying I/O error, when one exists
        #[source]
        source: Option<std::io::Error>,
    },
}

impl BackendError {
    /// The LDAP result code for this error.
    pub fn result_code(&self) -> u32 {
        match self {
            BackendError::NoSuchObject { .. } => 32,
            BackendError::UnwillingToPerform { .. } => 53,
            BackendError::InvalidConfiguration { .. } => 53,
            BackendError::NotAllowedOnNonLeaf { .. } => 66,
            BackendError::EntryAlreadyExists { .. } => 68,
            BackendError::ServerError { .. } => 80,
        }
    }

    /// The matched DN diagnostic: the deepest existing ancestor of the
    /// requested DN, when this error carries one.
    pub fn matched_dn(&self) -> Option<&Dn> {
        match self {
            BackendError::NoSuchObject { matched, .. } => matched.as_ref(),
            _ => None,
        }
    }

    /// Check if this error is a missing-entry failure.
    pub fn is_no_such_object(&self) -> bool {
        matches!(self, BackendError::NoSuchObject { .. })
    }

    /// Check if this error is an entry collision.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, BackendError::EntryAlreadyExists { .. })
    }

    /// Check if this error refused the operation outright.
    pub fn is_unwilling(&self) -> bool {
        matches!(
            self,
            BackendError::UnwillingToPerform { .. } | BackendError::InvalidConfiguration { .. }
        )
    }

    /// Check if this error is an internal server failure.
    pub fn is_server_error(&self) -> bool {
        matches!(self, BackendError::ServerError { .. })
    }

    pub(crate) fn server_io(reason: impl Into<String>, source: std::io::Error) -> Self {
        BackendError::ServerError {
            reason: reason.into(),
            source: Some(source),
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
