//! Parser for the backend's machine-readable status stream
//!
//! Backends write one status message per line, prefixed with
//! [`STATUS_PREFIX`]. Lines without the prefix are human-readable noise and
//! are skipped.
//!
//! # Security
//!
//! A genuine single-signature verification produces at most one of the
//! exclusive `*SIG` statuses. Seeing a second one means either several
//! signatures (unsupported) or a tampered stream, so parsing stops, the
//! verdict is forced to [`SigResult::Error`] and everything extracted so far
//! is discarded.

use crate::check::{SigResult, SignatureCheck};

/// Sentinel that starts every status line.
pub const STATUS_PREFIX: &str = "[GNUPG:] ";

/// Only one exclusive status may appear per stream
const EXCLUSIVE: u8 = 1 << 0;
/// Followed by a key id
const KEY_ID: u8 = 1 << 1;
/// Key id is followed by the signer user id
const UID: u8 = 1 << 2;
/// Followed by fingerprint fields
const FINGERPRINT: u8 = 1 << 3;

const STANDARD_SIG: u8 = EXCLUSIVE | KEY_ID | UID;

/// Number of fields advanced over after the fingerprint to reach the
/// primary key fingerprint.
const VALIDSIG_SKIPPED_FIELDS: usize = 9;

struct StatusKeyword {
    result: Option<SigResult>,
    prefix: &'static str,
    flags: u8,
}

impl StatusKeyword {
    const fn new(result: Option<SigResult>, prefix: &'static str, flags: u8) -> Self {
        Self {
            result,
            prefix,
            flags,
        }
    }

    fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

// Order matters: the first matching prefix is used.
const KEYWORDS: &[StatusKeyword] = &[
    StatusKeyword::new(Some(SigResult::Good), "GOODSIG ", STANDARD_SIG),
    StatusKeyword::new(Some(SigResult::Bad), "BADSIG ", STANDARD_SIG),
    StatusKeyword::new(Some(SigResult::Untrusted), "TRUST_NEVER", 0),
    StatusKeyword::new(Some(SigResult::Untrusted), "TRUST_UNDEFINED", 0),
    StatusKeyword::new(Some(SigResult::Error), "ERRSIG ", EXCLUSIVE | KEY_ID),
    StatusKeyword::new(Some(SigResult::ExpiredSignature), "EXPSIG ", STANDARD_SIG),
    StatusKeyword::new(Some(SigResult::ExpiredKey), "EXPKEYSIG ", STANDARD_SIG),
    StatusKeyword::new(Some(SigResult::RevokedKey), "REVKEYSIG ", STANDARD_SIG),
    StatusKeyword::new(None, "VALIDSIG ", FINGERPRINT),
];

/// Interpret a status stream and record the verdict in `check`.
///
/// Only `result`, `key`, `signer`, `fingerprint` and
/// `primary_key_fingerprint` are touched. Later statuses overwrite values
/// recorded by earlier ones.
pub fn parse_status(status: &[u8], check: &mut SignatureCheck) {
    let text = String::from_utf8_lossy(status);
    let mut seen_exclusive = false;

    for line in text.split('\n') {
        let Some(message) = line.strip_prefix(STATUS_PREFIX) else {
            continue;
        };
        let Some(keyword) = KEYWORDS.iter().find(|k| message.starts_with(k.prefix)) else {
            continue;
        };
        let fields = &message[keyword.prefix.len()..];

        if keyword.has(EXCLUSIVE) {
            if seen_exclusive {
                tracing::warn!(
                    "duplicate exclusive status '{}', rejecting signature",
                    keyword.prefix.trim_end()
                );
                check.result = SigResult::Error;
                check.clear_identifiers();
                return;
            }
            seen_exclusive = true;
        }

        if let Some(result) = keyword.result {
            check.result = result;
        }

        if keyword.has(KEY_ID) {
            let (key, signer) = match fields.split_once(' ') {
                Some((key, signer)) => (key, Some(signer)),
                None => (fields, None),
            };
            check.key = Some(key.to_string());
            if keyword.has(UID) {
                if let Some(signer) = signer {
                    check.signer = Some(signer.to_string());
                }
            }
        }

        if keyword.has(FINGERPRINT) {
            let (fingerprint, primary) = split_validsig(fields);
            check.fingerprint = Some(fingerprint.to_string());
            check.primary_key_fingerprint = Some(primary.to_string());
        }
    }
}

/// Whether any line of `status` carries the given status keyword.
///
/// `keyword` is matched as a prefix of the text after [`STATUS_PREFIX`],
/// so pass e.g. `"SIG_CREATED "` including the separator.
#[must_use]
pub fn has_status(status: &[u8], keyword: &str) -> bool {
    String::from_utf8_lossy(status).split('\n').any(|line| {
        line.strip_prefix(STATUS_PREFIX)
            .is_some_and(|message| message.starts_with(keyword))
    })
}

/// Extract `(fingerprint, primary key fingerprint)` from VALIDSIG fields.
///
/// The layout is `<fpr> <date> <ts> <expire> <ver> <reserved> <pkalgo>
/// <hashalgo> <class> <primary-fpr>`. On a shorter line the last field
/// reached is returned as the primary fingerprint.
fn split_validsig(fields: &str) -> (&str, &str) {
    let mut start = 0;
    let mut end = field_end(fields, 0);
    let fingerprint = &fields[..end];

    for _ in 0..VALIDSIG_SKIPPED_FIELDS {
        if end >= fields.len() {
            break;
        }
        start = end + 1;
        end = field_end(fields, start);
    }

    (fingerprint, &fields[start..])
}

fn field_end(fields: &str, from: usize) -> usize {
    fields[from..]
        .find(' ')
        .map_or(fields.len(), |offset| from + offset)
}
