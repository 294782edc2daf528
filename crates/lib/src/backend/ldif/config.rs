//! Configuration for the LDIF backend.

use std::path::{Path, PathBuf};

use crate::{backend::errors::BackendError, dn::Dn};

/// Validated configuration for one [`super::LdifBackend`] instance.
///
/// The backend serves exactly one base DN from exactly one dump file. The
/// private flag is passed through to the server when the base DN is
/// registered; it affects external visibility, not store behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdifBackendConfig {
    base_dn: Dn,
    ldif_file: PathBuf,
    is_private_backend: bool,
}

impl LdifBackendConfig {
    /// Validating constructor. The server hands over the configured base
    /// DN set; anything other than exactly one non-root DN is rejected at
    /// the config-acceptable check.
    pub fn new(base_dns: &[Dn], ldif_file: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let [base_dn] = base_dns else {
            return Err(BackendError::InvalidConfiguration {
                reason: format!(
                    "exactly one base DN is required, got {}",
                    base_dns.len()
                ),
            });
        };
        if base_dn.is_root() {
            return Err(BackendError::InvalidConfiguration {
                reason: "the base DN must not be the root DN".to_string(),
            });
        }
        Ok(LdifBackendConfig {
            base_dn: base_dn.clone(),
            ldif_file: ldif_file.into(),
            is_private_backend: false,
        })
    }

    /// Marks the backend private on base-DN registration.
    pub fn with_private_backend(mut self, is_private: bool) -> Self {
        self.is_private_backend = is_private;
        self
    }

    pub fn base_dn(&self) -> &Dn {
        &self.base_dn
    }

    pub fn ldif_file(&self) -> &Path {
        &self.ldif_file
    }

    pub fn is_private_backend(&self) -> bool {
        self.is_private_backend
    }
}
