//! Configuration module for the sigbridge CLI
//!
//! Settings come from two sources, applied in order:
//! - The JSON config file (`<config dir>/sigbridge/config.json`, or `--config`)
//! - CLI flags (highest precedence)
//!
//! The file is a flat object of signing settings:
//!
//! ```json
//! {
//!   "user.signingkey": "0xABCD1234",
//!   "gpg.format": "openpgp",
//!   "gpg.openpgp.program": "/usr/local/bin/gpg"
//! }
//! ```
//!
//! A `null` value is a setting present without a value, which is rejected
//! for every signing key.

pub mod identity;

use crate::error::{CliError, Result};
use serde::Deserialize;
use sigbridge::ConfigSource;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings loaded from the config file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FileConfig {
    entries: BTreeMap<String, Option<String>>,
}

impl FileConfig {
    /// Parse config file contents
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ConfigSource for FileConfig {
    fn get(&self, key: &str) -> Option<Option<String>> {
        self.entries.get(key).cloned()
    }
}

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sigbridge").join("config.json"))
}

/// Load the config file.
///
/// An explicitly named file must exist. The default file is optional: when
/// it is missing, an empty configuration is returned.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(FileConfig::default()),
        },
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config file at {}", path.display());
            return Ok(FileConfig::default());
        }
        Err(source) => {
            return Err(CliError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };

    let config = FileConfig::from_json(&content).map_err(|e| CliError::ConfigParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    tracing::debug!(
        "loaded {} settings from {}",
        config.entries.len(),
        path.display()
    );
    Ok(config)
}
