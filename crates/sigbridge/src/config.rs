//! Collaborator interfaces for configuration and signer identity
//!
//! The library never reads configuration files or the environment itself.
//! Callers provide a [`ConfigSource`] and an [`IdentitySource`]; the CLI
//! implements both on top of a JSON file and environment variables.

use crate::error::Result;
use std::collections::HashMap;

/// Key used to sign when none is given explicitly
pub const SIGNING_KEY: &str = "user.signingkey";
/// Name of the active signature format
pub const FORMAT: &str = "gpg.format";
/// Program for the OpenPGP format (legacy spelling)
pub const PROGRAM: &str = "gpg.program";
/// Program for the OpenPGP format
pub const OPENPGP_PROGRAM: &str = "gpg.openpgp.program";
/// Program for the X.509 format
pub const X509_PROGRAM: &str = "gpg.x509.program";

/// Every key understood by [`SigningBackend::apply_config`], in the order
/// [`SigningBackend::from_config`] applies them.
///
/// [`SigningBackend::apply_config`]: crate::SigningBackend::apply_config
/// [`SigningBackend::from_config`]: crate::SigningBackend::from_config
pub const KNOWN_KEYS: &[&str] = &[SIGNING_KEY, FORMAT, PROGRAM, OPENPGP_PROGRAM, X509_PROGRAM];

/// A source of configuration values.
pub trait ConfigSource {
    /// Look up `key`.
    ///
    /// Returns `None` when the key is not set, `Some(None)` when it is
    /// present without a value, and `Some(Some(value))` otherwise.
    fn get(&self, key: &str) -> Option<Option<String>>;
}

impl ConfigSource for HashMap<String, Option<String>> {
    fn get(&self, key: &str) -> Option<Option<String>> {
        HashMap::get(self, key).cloned()
    }
}

/// Supplies the signer used when no signing key is configured.
pub trait IdentitySource {
    /// Default signer, typically `Name <email>`.
    ///
    /// # Errors
    ///
    /// Returns `SigError::Identity` if no identity can be determined.
    fn default_signer(&self) -> Result<String>;
}

/// Identity fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedIdentity(pub String);

impl IdentitySource for FixedIdentity {
    fn default_signer(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
