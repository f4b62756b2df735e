//! Default signer identity from the environment

use sigbridge::{IdentitySource, SigError};

/// Explicit signer override
const SIGNER_VAR: &str = "SIGBRIDGE_SIGNER";
const NAME_VAR: &str = "GIT_COMMITTER_NAME";
const EMAIL_VAR: &str = "GIT_COMMITTER_EMAIL";

/// Identity read from `SIGBRIDGE_SIGNER`, else from the committer
/// name and email variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvIdentity;

impl IdentitySource for EnvIdentity {
    fn default_signer(&self) -> sigbridge::Result<String> {
        identity_from(|var| std::env::var(var).ok())
    }
}

fn identity_from(lookup: impl Fn(&str) -> Option<String>) -> sigbridge::Result<String> {
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(signer) = get(SIGNER_VAR) {
        return Ok(signer);
    }

    match (get(NAME_VAR), get(EMAIL_VAR)) {
        (Some(name), Some(email)) => Ok(format!("{} <{}>", name.trim(), email.trim())),
        _ => Err(SigError::Identity(format!(
            "set user.signingkey, {SIGNER_VAR}, or both {NAME_VAR} and {EMAIL_VAR}"
        ))),
    }
}
