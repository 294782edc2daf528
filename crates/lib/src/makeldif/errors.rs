//! Error types for the MakeLDIF generator.

use std::path::PathBuf;

use thiserror::Error;

/// Unrecoverable problems constructing a generator. Anything the
/// generator can sensibly work around is reported as a warning instead.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("cannot read template file {path}")]
    Io {
        /// The path that failed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A line violated the template grammar.
    #[error("template syntax error at line {line}: {reason}")]
    Syntax {
        /// 1-based line number
        line: u64,
        /// What was wrong
        reason: String,
    },

    /// A template block lacks the mandatory `rdnAttr` line.
    #[error("template {name} has no rdnAttr")]
    MissingRdnAttr {
        /// The template name
        name: String,
    },

    /// A template's `rdnAttr` names an attribute the template never
    /// generates.
    #[error("template {name} never generates its rdnAttr {attr}")]
    RdnAttrNotGenerated {
        /// The template name
        name: String,
        /// The missing attribute
        attr: String,
    },

    /// The template file defines no branches, so nothing can be generated.
    #[error("template file defines no branches")]
    NoBranches,
}

impl From<TemplateError> for crate::Error {
    fn from(err: TemplateError) -> Self {
        crate::Error::Template(err)
    }
}
