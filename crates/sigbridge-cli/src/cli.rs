//! CLI argument definitions for sigbridge
//!
//! Uses clap for argument parsing. This module defines all subcommands
//! and their options.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sigbridge - detached signatures through gpg or gpgsm
///
/// Signs and verifies detached signatures by running an external OpenPGP or
/// X.509 signing program and interpreting its status output.
#[derive(Parser, Debug)]
#[command(name = "sigbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: <config dir>/sigbridge/config.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Signature format used for signing (overrides gpg.format)
    #[arg(long, global = true, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Program to launch for the selected format
    #[arg(long, global = true, value_name = "PATH")]
    pub program: Option<String>,

    /// Silent mode - suppress the verification summary
    #[arg(long, short = 's', global = true)]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a detached signature
    #[command(after_help = "EXAMPLES:
    # Sign with user.signingkey (or the committer identity)
    sigbridge sign message.txt > message.txt.asc

    # Sign with a specific key
    sigbridge sign -u 0xABCD1234 message.txt -o message.txt.asc

    # Sign with gpgsm
    sigbridge --format x509 sign message.txt
")]
    Sign(SignArgs),

    /// Verify a detached or embedded signature
    #[command(after_help = "EXAMPLES:
    # Verify a detached signature
    sigbridge verify message.txt --signature message.txt.asc

    # Verify a buffer whose signature block is appended at the end
    sigbridge verify signed-tag.txt

    # Show the raw status stream and the signed payload
    sigbridge verify signed-tag.txt --raw --verbose
")]
    Verify(VerifyArgs),

    /// Print the offset at which a trailing signature block starts
    Split(SplitArgs),

    /// List the known signature formats
    Formats,
}

#[derive(Parser, Debug)]
pub struct SignArgs {
    /// File to sign ("-" for stdin)
    pub file: PathBuf,

    /// Key to sign with (overrides user.signingkey)
    #[arg(long = "local-user", short = 'u', value_name = "KEY")]
    pub local_user: Option<String>,

    /// Write the signature here instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Signed file ("-" for stdin)
    pub file: PathBuf,

    /// Detached signature file. When omitted, the signature is taken from
    /// the end of FILE.
    #[arg(long, value_name = "SIG")]
    pub signature: Option<PathBuf>,

    /// Print the raw status stream instead of the backend's messages
    #[arg(long)]
    pub raw: bool,

    /// Also print the signed payload
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Print the verdict as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct SplitArgs {
    /// File to inspect ("-" for stdin)
    pub file: PathBuf,
}
