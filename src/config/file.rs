//! TOML configuration file
//!
//! The schema is a closed set of options; unknown keys are rejected.
//!
//! ```toml
//! ignore_dotfiles = true
//! ignore_list = ["/home/me/photos/cache", "tmp"]
//! risky = false
//! ```

use crate::types::SyncError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Options a configuration file may set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Skip entries whose name starts with `.`
    pub ignore_dotfiles: Option<bool>,

    /// Paths never walked (absolute, or relative to the scanned root)
    #[serde(default)]
    pub ignore_list: Vec<PathBuf>,

    /// `true` overwrites in place, `false` selects safe copies
    pub risky: Option<bool>,
}

impl ConfigFile {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, SyncError> {
        toml::from_str(content).map_err(|e| SyncError::Config(format!("Invalid config: {}", e)))
    }

    /// Load a configuration file that must exist
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content).map_err(|e| match e {
            SyncError::Config(msg) => SyncError::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Load the default configuration file, treating absence as empty
    pub fn load_if_present(path: &Path) -> Result<Self, SyncError> {
        match fs::metadata(path) {
            Ok(_) => Self::load(path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(SyncError::Config(format!(
                "Failed to inspect config file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
