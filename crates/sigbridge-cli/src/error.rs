//! Error types for the sigbridge CLI.

use sigbridge::SigError;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Signing(#[from] SigError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {reason}")]
    ConfigParse { path: String, reason: String },

    #[error("no signature found in {0}")]
    NoSignature(String),
}

/// Result type alias for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
