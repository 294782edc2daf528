//! Codec error types for the LDIF module.

use thiserror::Error;

/// Errors that can occur while reading or writing LDIF.
///
/// A `MalformedRecord` marked `continuable` means the reader has consumed
/// the record and can continue with the next one; callers doing bulk loads
/// skip such records with a warning. A non-continuable error leaves the
/// stream in an undefined position and must abort the load.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LdifError {
    /// A record violated the LDIF syntax.
    #[error("malformed LDIF record at line {line}: {reason}")]
    MalformedRecord {
        /// Line number where the record starts or the problem was seen
        line: u64,
        /// What was wrong with the record
        reason: String,
        /// Whether the reader can continue with the next record
        continuable: bool,
    },

    /// Underlying stream I/O failure.
    #[error("LDIF I/O error")]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl LdifError {
    /// Check if the reader can keep going after this error.
    pub fn is_continuable(&self) -> bool {
        matches!(
            self,
            LdifError::MalformedRecord {
                continuable: true,
                ..
            }
        )
    }

    pub(crate) fn malformed(line: u64, reason: impl Into<String>) -> Self {
        LdifError::MalformedRecord {
            line,
            reason: reason.into(),
            continuable: true,
        }
    }
}

impl From<std::io::Error> for LdifError {
    fn from(source: std::io::Error) -> Self {
        LdifError::Io { source }
    }
}

impl From<LdifError> for crate::Error {
    fn from(err: LdifError) -> Self {
        crate::Error::Ldif(err)
    }
}
