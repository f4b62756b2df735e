//! Signature format registry
//!
//! A [`Format`] describes one backend family: the program that is launched,
//! the extra arguments it needs for verification, and the armor header lines
//! that identify its signature blocks.
//!
//! The [`FormatRegistry`] holds the built-in formats in a fixed order and
//! tracks which one is active for signing. Verification never consults the
//! active format; it picks the format from the signature bytes instead.

use crate::error::{Result, SigError};

/// Name of the OpenPGP format (default).
pub const OPENPGP: &str = "openpgp";

/// Name of the X.509 / CMS format.
pub const X509: &str = "x509";

const OPENPGP_VERIFY_ARGS: &[&str] = &["--keyid-format=long"];
const OPENPGP_MARKERS: &[&str] = &[
    "-----BEGIN PGP SIGNATURE-----",
    "-----BEGIN PGP MESSAGE-----",
];

const X509_VERIFY_ARGS: &[&str] = &[];
const X509_MARKERS: &[&str] = &["-----BEGIN SIGNED MESSAGE-----"];

/// A signing backend family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    name: &'static str,
    program: String,
    verify_args: &'static [&'static str],
    markers: &'static [&'static str],
}

impl Format {
    fn builtin(
        name: &'static str,
        program: &str,
        verify_args: &'static [&'static str],
        markers: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            program: program.to_string(),
            verify_args,
            markers,
        }
    }

    /// Format name as used by the `gpg.format` setting
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Program launched for this format
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments inserted right after the program name when verifying
    #[must_use]
    pub fn verify_args(&self) -> &[&'static str] {
        self.verify_args
    }

    /// Armor header lines that start a signature block of this format
    #[must_use]
    pub fn markers(&self) -> &[&'static str] {
        self.markers
    }

    /// Whether `line` starts with one of this format's markers
    #[must_use]
    pub fn starts_block(&self, line: &[u8]) -> bool {
        self.markers
            .iter()
            .any(|marker| line.starts_with(marker.as_bytes()))
    }
}

/// The set of known formats plus the active signing format.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<Format>,
    active: usize,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self {
            formats: vec![
                Format::builtin(OPENPGP, "gpg", OPENPGP_VERIFY_ARGS, OPENPGP_MARKERS),
                Format::builtin(X509, "gpgsm", X509_VERIFY_ARGS, X509_MARKERS),
            ],
            active: 0,
        }
    }
}

impl FormatRegistry {
    /// Create a registry holding the built-in formats, with `openpgp` active.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All formats in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Format> {
        self.formats.iter()
    }

    /// The format used for signing
    #[must_use]
    pub fn active(&self) -> &Format {
        &self.formats[self.active]
    }

    /// Select the format used for signing.
    ///
    /// # Errors
    ///
    /// Returns `SigError::UnknownFormat` if no format has that name.
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        self.active = index;
        tracing::debug!("active signature format: {}", name);
        Ok(())
    }

    /// Look up a format by name
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Format> {
        self.formats.iter().find(|f| f.name == name)
    }

    /// Find the format of a signature from its header bytes.
    ///
    /// Every marker of every format is searched for anywhere in `signature`.
    /// The format whose marker occurs first wins; when markers of two
    /// formats start at the same offset, registration order decides.
    #[must_use]
    pub fn by_signature(&self, signature: &[u8]) -> Option<&Format> {
        let mut best: Option<(usize, &Format)> = None;
        for format in &self.formats {
            for marker in format.markers {
                let Some(offset) = find_bytes(signature, marker.as_bytes()) else {
                    continue;
                };
                if best.is_none_or(|(best_offset, _)| offset < best_offset) {
                    best = Some((offset, format));
                }
            }
        }
        best.map(|(_, format)| format)
    }

    /// The first format that has a marker at the start of `line`
    #[must_use]
    pub fn format_at_line_start(&self, line: &[u8]) -> Option<&Format> {
        self.formats.iter().find(|f| f.starts_block(line))
    }

    /// Replace the program launched for the named format.
    ///
    /// # Errors
    ///
    /// Returns `SigError::UnknownFormat` if no format has that name.
    pub fn set_program(&mut self, name: &str, program: &str) -> Result<()> {
        let index = self.index_of(name)?;
        tracing::debug!("program for format {}: {}", name, program);
        self.formats[index].program = program.to_string();
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.formats
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| SigError::UnknownFormat(name.to_string()))
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
