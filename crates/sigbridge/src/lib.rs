//! Detached signatures through an external signing program
//!
//! `sigbridge` signs and verifies detached signatures by running an
//! OpenPGP (`gpg`) or X.509 (`gpgsm`) backend. All cryptography happens in
//! the backend; this crate owns format selection, the subprocess plumbing,
//! and a strict parser for the backend's status protocol.
//!
//! # Architecture
//!
//! ```text
//! SigningBackend --> FormatRegistry (pick backend) --> pipeline (spawn, pipe)
//!   --> status parser (interpret output) --> SignatureCheck / signature bytes
//! ```
//!
//! # Components
//!
//! - **Formats** ([`format`]): built-in backends, program overrides, active format
//! - **Sniffer** ([`sniff`]): locate a trailing signature block in a buffer
//! - **Status** ([`status`]): parse `[GNUPG:]` status lines into a verdict
//! - **Pipeline** ([`pipeline`]): run the backend without pipe deadlocks
//! - **Backend** ([`backend`]): `sign_buffer`, `check_signature`, `verify_quick`
//! - **Config** ([`config`]): collaborator traits for settings and identity
//!
//! # Example
//!
//! ```no_run
//! use sigbridge::SigningBackend;
//!
//! let backend = SigningBackend::new();
//! let signature = backend.sign_buffer(b"hello\n", "ABCD1234")?;
//! let (verified, check) = backend.check_signature(b"hello\n", &signature)?;
//! println!("{verified}: {}", check.result);
//! # Ok::<(), sigbridge::SigError>(())
//! ```
//!
//! # Security
//!
//! - A second exclusive status (`GOODSIG`, `BADSIG`, ...) in one stream
//!   rejects the whole verification
//! - The temporary signature file is removed on every exit path
//! - Backend failures during verification are reported in the verdict, never
//!   as a process abort

pub mod backend;
pub mod check;
pub mod config;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod sniff;
pub mod status;

pub use backend::SigningBackend;
pub use check::{OutputFlags, SigResult, SignatureCheck};
pub use config::{ConfigSource, FixedIdentity, IdentitySource};
pub use error::{Result, SigError};
pub use format::{Format, FormatRegistry};
pub use pipeline::VerifyOutput;
pub use sniff::{find_signature_offset, split_signed_buffer};
pub use status::{parse_status, STATUS_PREFIX};
