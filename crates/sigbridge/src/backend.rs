//! Signing and verification entry points
//!
//! [`SigningBackend`] owns the format registry and the configured signing
//! key, and composes the pipeline and the status parser into the two public
//! operations: producing a detached signature and checking one.

use crate::check::SignatureCheck;
use crate::config::{self, ConfigSource, IdentitySource};
use crate::error::{Result, SigError};
use crate::format::{FormatRegistry, OPENPGP, X509};
use crate::pipeline::{self, VerifyOutput};
use crate::sniff;
use crate::status::{self, parse_status};

/// Status emitted by the backend once a signature has been written
const SIG_CREATED: &str = "SIG_CREATED ";
/// Status emitted for a good signature
const GOODSIG: &str = "GOODSIG ";

/// Signing/verification front end for an external signing program.
#[derive(Debug, Clone, Default)]
pub struct SigningBackend {
    registry: FormatRegistry,
    signing_key: Option<String>,
}

impl SigningBackend {
    /// Backend with the built-in formats and no configured key
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend using an explicitly prepared registry
    #[must_use]
    pub fn with_registry(registry: FormatRegistry) -> Self {
        Self {
            registry,
            signing_key: None,
        }
    }

    /// Build a backend from every known key present in `source`.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`SigningBackend::apply_config`].
    pub fn from_config(source: &dyn ConfigSource) -> Result<Self> {
        let mut backend = Self::new();
        for key in config::KNOWN_KEYS {
            if let Some(value) = source.get(key) {
                backend.apply_config(key, value.as_deref())?;
            }
        }
        Ok(backend)
    }

    #[must_use]
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FormatRegistry {
        &mut self.registry
    }

    /// Apply one configuration entry.
    ///
    /// Returns `Ok(true)` if the key was recognized, `Ok(false)` if it is
    /// not a signing setting and was ignored.
    ///
    /// # Errors
    ///
    /// Returns `SigError::MissingConfigValue` if a recognized key has no
    /// value and `SigError::UnsupportedConfigValue` for an unknown
    /// `gpg.format`.
    pub fn apply_config(&mut self, key: &str, value: Option<&str>) -> Result<bool> {
        let format = match key {
            config::SIGNING_KEY => {
                self.set_signing_key(require_value(key, value)?);
                return Ok(true);
            }
            config::FORMAT => {
                let name = require_value(key, value)?;
                if self.registry.by_name(name).is_none() {
                    return Err(SigError::UnsupportedConfigValue {
                        key: key.to_string(),
                        value: name.to_string(),
                    });
                }
                self.registry.set_active(name)?;
                return Ok(true);
            }
            config::PROGRAM | config::OPENPGP_PROGRAM => OPENPGP,
            config::X509_PROGRAM => X509,
            _ => return Ok(false),
        };

        let program = require_value(key, value)?;
        self.registry.set_program(format, program)?;
        Ok(true)
    }

    pub fn set_signing_key(&mut self, key: &str) {
        tracing::debug!("signing key: {}", key);
        self.signing_key = Some(key.to_string());
    }

    /// The explicitly configured signing key, if any
    #[must_use]
    pub fn configured_signing_key(&self) -> Option<&str> {
        self.signing_key.as_deref()
    }

    /// The key to sign with: the configured one, else the default signer.
    ///
    /// # Errors
    ///
    /// Returns the identity source's error when no key is configured and no
    /// identity is available.
    pub fn signing_key(&self, identity: &dyn IdentitySource) -> Result<String> {
        match &self.signing_key {
            Some(key) => Ok(key.clone()),
            None => identity.default_signer(),
        }
    }

    /// Byte offset of the trailing signature block in `buffer`
    #[must_use]
    pub fn find_signature_offset(&self, buffer: &[u8]) -> usize {
        sniff::find_signature_offset(&self.registry, buffer)
    }

    /// Create a detached signature over `buffer` with the active format.
    ///
    /// Carriage returns are stripped from the produced signature.
    ///
    /// # Errors
    ///
    /// Returns `SigError::SigningFailed` if the backend cannot be started,
    /// exits unsuccessfully, does not consume the payload, or does not
    /// report `SIG_CREATED`.
    pub fn sign_buffer(&self, buffer: &[u8], signing_key: &str) -> Result<Vec<u8>> {
        let program = self.registry.active().program();
        let failed = |reason: String| SigError::SigningFailed {
            program: program.to_string(),
            reason,
        };

        let out = match pipeline::run_sign(program, signing_key, buffer) {
            Ok(out) => out,
            Err(SigError::Spawn { source, .. }) => {
                return Err(failed(format!("could not start backend: {source}")));
            }
            Err(e) => return Err(e),
        };

        let reason = if let Some(e) = &out.input_error {
            Some(format!("could not write payload: {e}"))
        } else if !out.status.success() {
            Some(format!("backend exited with {}", out.status))
        } else if !status::has_status(&out.stderr, SIG_CREATED) {
            Some("backend did not report a created signature".to_string())
        } else {
            None
        };
        if let Some(reason) = reason {
            tracing::warn!(
                "signing failed: {}\n{}",
                reason,
                String::from_utf8_lossy(&out.stderr)
            );
            return Err(failed(reason));
        }

        let mut signature = out.stdout;
        signature.retain(|&b| b != b'\r');
        Ok(signature)
    }

    /// Run the backend's verification over `payload` and `signature`.
    ///
    /// The format is chosen from the signature's header. A backend that
    /// cannot be started is reported as an unsuccessful run with no output.
    ///
    /// # Errors
    ///
    /// Returns `SigError::UnrecognizedSignature` if `signature` matches no
    /// known format, and `SigError::TempFile` if the signature cannot be
    /// written to disk.
    pub fn verify_signed_buffer(&self, payload: &[u8], signature: &[u8]) -> Result<VerifyOutput> {
        let Some(format) = self.registry.by_signature(signature) else {
            tracing::error!(
                "signature of {} bytes matches no known format",
                signature.len()
            );
            return Err(SigError::UnrecognizedSignature);
        };

        match pipeline::run_verify(format, payload, signature) {
            Ok(out) => Ok(out),
            Err(SigError::Spawn { program, source }) => {
                tracing::warn!("could not start '{}': {}", program, source);
                Ok(VerifyOutput::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Verify `signature` over `payload` and interpret the backend's verdict.
    ///
    /// Returns whether the signature is acceptable together with the
    /// verdict. Acceptable means the backend run succeeded and the result
    /// is good (possibly from an untrusted key). When the run failed without
    /// producing any output, the verdict is left at "no signature".
    ///
    /// # Errors
    ///
    /// See [`SigningBackend::verify_signed_buffer`].
    pub fn check_signature(
        &self,
        payload: &[u8],
        signature: &[u8],
    ) -> Result<(bool, SignatureCheck)> {
        let mut check = SignatureCheck::new();

        let run = self.verify_signed_buffer(payload, signature)?;
        if !run.success && run.output.is_empty() {
            return Ok((false, check));
        }

        parse_status(&run.status, &mut check);
        check.payload = Some(payload.to_vec());
        check.output = Some(run.output);
        check.status = Some(run.status);

        let verified = run.success && check.result.is_trusted();
        if !verified {
            tracing::info!("signature not accepted: {}", check.result);
        }
        Ok((verified, check))
    }

    /// Like [`SigningBackend::check_signature`], but additionally requires a
    /// literal `GOODSIG` status line.
    ///
    /// # Errors
    ///
    /// See [`SigningBackend::verify_signed_buffer`].
    pub fn verify_quick(&self, payload: &[u8], signature: &[u8]) -> Result<bool> {
        let (verified, check) = self.check_signature(payload, signature)?;
        let good = check
            .status
            .as_deref()
            .is_some_and(|s| status::has_status(s, GOODSIG));
        Ok(verified && good)
    }
}

fn require_value<'a>(key: &str, value: Option<&'a str>) -> Result<&'a str> {
    value.ok_or_else(|| SigError::MissingConfigValue {
        key: key.to_string(),
    })
}
