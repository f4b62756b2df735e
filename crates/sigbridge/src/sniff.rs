//! Locating an embedded signature block
//!
//! Signed objects often carry their signature appended after the payload.
//! These helpers find where the trailing block starts so the two halves can
//! be handed to verification separately.

use crate::format::FormatRegistry;

/// Byte offset at which the trailing signature block of `buffer` starts.
///
/// Scans `buffer` line by line and remembers the start of the last line
/// that begins with any known marker. Returns `buffer.len()` when no line
/// matches, meaning the whole buffer is payload.
#[must_use]
pub fn find_signature_offset(registry: &FormatRegistry, buffer: &[u8]) -> usize {
    let mut offset = 0;
    let mut found = buffer.len();

    while offset < buffer.len() {
        let rest = &buffer[offset..];
        if registry.format_at_line_start(rest).is_some() {
            found = offset;
        }
        offset += match rest.iter().position(|&b| b == b'\n') {
            Some(eol) => eol + 1,
            None => rest.len(),
        };
    }

    found
}

/// Split `buffer` into `(payload, signature)` at the signature offset.
///
/// The signature half is empty when no block was found.
#[must_use]
pub fn split_signed_buffer<'a>(registry: &FormatRegistry, buffer: &'a [u8]) -> (&'a [u8], &'a [u8]) {
    buffer.split_at(find_signature_offset(registry, buffer))
}
