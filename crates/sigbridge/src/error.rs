//! Error types for the sigbridge crate.

use thiserror::Error;

/// Errors that can occur while signing or verifying through a backend.
///
/// Verification problems caused by the backend itself (nonzero exit,
/// ambiguous status output) are not errors: they are reported through the
/// returned [`SignatureCheck`](crate::SignatureCheck) so callers can inspect
/// the captured output.
#[derive(Error, Debug)]
pub enum SigError {
    #[error("missing value for '{key}'")]
    MissingConfigValue { key: String },

    #[error("unsupported value for {key}: {value}")]
    UnsupportedConfigValue { key: String, value: String },

    #[error("unknown signature format: {0}")]
    UnknownFormat(String),

    #[error("{reason}: {source}")]
    TempFile {
        reason: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed to sign the data: {reason}")]
    SigningFailed { program: String, reason: String },

    #[error("subprocess pipeline error: {0}")]
    Pipeline(String),

    /// A signature buffer matched none of the registered formats.
    ///
    /// Callers must locate signatures with the sniffer before verifying, so
    /// this indicates a bug in the caller rather than bad input.
    #[error("signature does not match any known format")]
    UnrecognizedSignature,

    #[error("cannot determine signer identity: {0}")]
    Identity(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for signing operations.
pub type Result<T> = std::result::Result<T, SigError>;
