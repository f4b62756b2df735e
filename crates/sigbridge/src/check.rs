//! Verification verdict types
//!
//! A [`SignatureCheck`] is produced fresh for every verification call and
//! carries both the structured verdict and the raw backend output it was
//! derived from, so callers can show diagnostics even when verification
//! fails.

use std::fmt;
use std::io::Write;

/// Classification of a verification attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SigResult {
    /// Good signature
    Good,
    /// Bad signature
    Bad,
    /// Good signature from a key with undefined or never trust
    Untrusted,
    /// Signature could not be checked, or the status output was ambiguous
    Error,
    /// Good signature that has expired
    ExpiredSignature,
    /// Good signature made by an expired key
    ExpiredKey,
    /// Good signature made by a revoked key
    RevokedKey,
    /// No signature
    #[default]
    None,
}

impl SigResult {
    /// Single-letter code used in status summaries (`G`, `B`, `U`, ...)
    #[must_use]
    pub fn code(self) -> char {
        match self {
            SigResult::Good => 'G',
            SigResult::Bad => 'B',
            SigResult::Untrusted => 'U',
            SigResult::Error => 'E',
            SigResult::ExpiredSignature => 'X',
            SigResult::ExpiredKey => 'Y',
            SigResult::RevokedKey => 'R',
            SigResult::None => 'N',
        }
    }

    /// Parse a single-letter code
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'G' => SigResult::Good,
            'B' => SigResult::Bad,
            'U' => SigResult::Untrusted,
            'E' => SigResult::Error,
            'X' => SigResult::ExpiredSignature,
            'Y' => SigResult::ExpiredKey,
            'R' => SigResult::RevokedKey,
            'N' => SigResult::None,
            _ => return None,
        })
    }

    /// Whether this result counts as a successful verification.
    ///
    /// Untrusted keys are accepted; callers wanting a stricter policy can
    /// compare against [`SigResult::Good`] themselves.
    #[must_use]
    pub fn is_trusted(self) -> bool {
        matches!(self, SigResult::Good | SigResult::Untrusted)
    }
}

impl fmt::Display for SigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SigResult::Good => "good signature",
            SigResult::Bad => "bad signature",
            SigResult::Untrusted => "good signature, untrusted key",
            SigResult::Error => "signature cannot be checked",
            SigResult::ExpiredSignature => "good signature, expired",
            SigResult::ExpiredKey => "good signature, expired key",
            SigResult::RevokedKey => "good signature, revoked key",
            SigResult::None => "no signature",
        };
        f.write_str(text)
    }
}

/// Presentation options for [`SignatureCheck::print`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFlags {
    /// Emit the raw status stream instead of the console output
    pub raw: bool,
    /// Also emit the signed payload
    pub verbose: bool,
}

/// Outcome of one verification call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureCheck {
    /// Structured verdict
    pub result: SigResult,
    /// The payload the signature was checked against
    pub payload: Option<Vec<u8>>,
    /// Human-readable backend output
    pub output: Option<Vec<u8>>,
    /// Raw status stream
    pub status: Option<Vec<u8>>,
    /// Signer user id, as reported with the key id
    pub signer: Option<String>,
    /// Key id of the signing key
    pub key: Option<String>,
    /// Fingerprint of the signing (sub)key
    pub fingerprint: Option<String>,
    /// Fingerprint of the primary key
    pub primary_key_fingerprint: Option<String>,
}

impl SignatureCheck {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Release all captured data and reset the verdict to "no signature".
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Drop every extracted identifier.
    pub(crate) fn clear_identifiers(&mut self) {
        self.primary_key_fingerprint = None;
        self.fingerprint = None;
        self.signer = None;
        self.key = None;
    }

    /// Write the verification output.
    ///
    /// With `verbose`, the signed payload goes to `out` first. The status
    /// stream (`raw`) or the console output (default) goes to `err`.
    ///
    /// # Errors
    ///
    /// Returns any error from the writers.
    pub fn print(
        &self,
        flags: OutputFlags,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> std::io::Result<()> {
        if flags.verbose {
            if let Some(payload) = &self.payload {
                out.write_all(payload)?;
            }
        }

        let text = if flags.raw { &self.status } else { &self.output };
        if let Some(text) = text {
            err.write_all(text)?;
        }
        Ok(())
    }
}
