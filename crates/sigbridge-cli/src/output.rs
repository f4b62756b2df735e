//! CLI output styling for sigbridge

use colored::Colorize;
use serde::Serialize;
use sigbridge::{FormatRegistry, SigResult, SignatureCheck};

/// Machine-readable verdict printed by `verify --json`.
#[derive(Debug, Serialize)]
pub struct VerdictReport<'a> {
    pub verified: bool,
    /// Single-letter result code
    pub result: char,
    pub description: String,
    pub key: Option<&'a str>,
    pub signer: Option<&'a str>,
    pub fingerprint: Option<&'a str>,
    pub primary_key_fingerprint: Option<&'a str>,
}

impl<'a> VerdictReport<'a> {
    #[must_use]
    pub fn new(check: &'a SignatureCheck, verified: bool) -> Self {
        Self {
            verified,
            result: check.result.code(),
            description: check.result.to_string(),
            key: check.key.as_deref(),
            signer: check.signer.as_deref(),
            fingerprint: check.fingerprint.as_deref(),
            primary_key_fingerprint: check.primary_key_fingerprint.as_deref(),
        }
    }

    /// Serialize to pretty JSON
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Print a colored verification summary to stderr
pub fn print_verdict(check: &SignatureCheck, verified: bool, silent: bool) {
    if silent {
        return;
    }

    let label = check.result.to_string();
    let label = match check.result {
        SigResult::Good => label.green().bold(),
        SigResult::Untrusted => label.yellow().bold(),
        SigResult::ExpiredSignature | SigResult::ExpiredKey => label.yellow(),
        _ => label.red().bold(),
    };
    eprintln!("{} [{}]", label, check.result.code());

    if let Some(signer) = &check.signer {
        eprintln!("  {} {}", "signer:".white(), signer);
    }
    if let Some(key) = &check.key {
        eprintln!("  {} {}", "key:".white(), key.truecolor(150, 150, 150));
    }
    if let Some(fpr) = &check.fingerprint {
        eprintln!("  {} {}", "fingerprint:".white(), fpr.truecolor(150, 150, 150));
    }
    if let Some(primary) = &check.primary_key_fingerprint {
        if check.fingerprint.as_ref() != Some(primary) {
            eprintln!(
                "  {} {}",
                "primary key:".white(),
                primary.truecolor(150, 150, 150)
            );
        }
    }

    if verified {
        eprintln!("{}", "Signature verified".green());
    } else {
        eprintln!("{}", "Signature NOT verified".red());
    }
}

/// Print the known signature formats, marking the active one
pub fn print_formats(registry: &FormatRegistry) {
    let active = registry.active().name();
    for format in registry.iter() {
        let marker = if format.name() == active { "*" } else { " " };
        println!("{} {:<8} {}", marker, format.name().bold(), format.program());
        for header in format.markers() {
            println!("    {}", header.truecolor(150, 150, 150));
        }
    }
}
