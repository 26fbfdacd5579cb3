//! Configuration management

mod cli;
mod file;

pub use cli::{Cli, Command};
pub use file::ConfigFile;

use crate::types::SyncError;
use std::path::{Path, PathBuf};

/// Default file name under the user config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// How unmatched files are written to the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    /// Overwrite the target path directly
    #[default]
    Risky,

    /// Write a hidden temporary sibling, verify its digest, then rename over the target
    Safe,
}

impl CopyMode {
    pub fn from_risky(risky: bool) -> Self {
        if risky {
            CopyMode::Risky
        } else {
            CopyMode::Safe
        }
    }
}

/// Resolved configuration for one run
#[derive(Debug, Clone)]
pub struct Config {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory
    pub destination: PathBuf,

    /// Skip entries whose name starts with `.`
    pub ignore_dotfiles: bool,

    /// Paths left out of both walks
    pub ignore_list: Vec<PathBuf>,

    /// Copy strategy for unmatched files
    pub copy_mode: CopyMode,

    /// Number of copy workers (1 = sequential)
    pub threads: usize,

    /// Per-file hashing cap in bytes (None = whole file)
    pub max_hash_bytes: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            ignore_dotfiles: true,
            ignore_list: Vec::new(),
            copy_mode: CopyMode::Risky,
            threads: 4,
            max_hash_bytes: None,
        }
    }
}

impl Config {
    /// Build a configuration from parsed arguments
    ///
    /// Precedence is CLI flags, then the config file, then defaults. An
    /// explicit `--conf` must exist; the default location may be absent.
    pub fn from_cli(cli: &Cli) -> Result<Self, SyncError> {
        let file = match &cli.conf {
            Some(path) => ConfigFile::load(path)?,
            None => match default_config_path() {
                Some(path) => ConfigFile::load_if_present(&path)?,
                None => ConfigFile::default(),
            },
        };
        Self::merge(cli, file)
    }

    /// Combine CLI arguments with file options
    pub fn merge(cli: &Cli, file: ConfigFile) -> Result<Self, SyncError> {
        let defaults = Config::default();

        let source = match &cli.source {
            Some(path) => path.clone(),
            None => default_root("test-src")?,
        };
        let destination = match &cli.destination {
            Some(path) => path.clone(),
            None => default_root("test-dst")?,
        };

        let ignore_dotfiles = if cli.no_ignore_dotfiles {
            false
        } else {
            file.ignore_dotfiles.unwrap_or(defaults.ignore_dotfiles)
        };

        let copy_mode = if cli.safe {
            CopyMode::Safe
        } else {
            file.risky.map(CopyMode::from_risky).unwrap_or(defaults.copy_mode)
        };

        let mut ignore_list = file.ignore_list;
        ignore_list.extend(cli.ignore.iter().cloned());

        Ok(Self {
            source,
            destination,
            ignore_dotfiles,
            ignore_list,
            copy_mode,
            threads: cli.threads.unwrap_or(defaults.threads).max(1),
            max_hash_bytes: cli.max_hash_bytes,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.source.exists() {
            return Err(SyncError::Validation(format!(
                "Source path does not exist: {}",
                self.source.display()
            )));
        }

        if !self.source.is_dir() {
            return Err(SyncError::Validation(format!(
                "Source path is not a directory: {}",
                self.source.display()
            )));
        }

        if self.destination.exists() && !self.destination.is_dir() {
            return Err(SyncError::Validation(format!(
                "Destination path is not a directory: {}",
                self.destination.display()
            )));
        }

        let source = normalize(&self.source);
        let destination = normalize(&self.destination);

        if source == destination {
            return Err(SyncError::Validation(
                "Source and destination cannot be the same".to_string(),
            ));
        }

        if destination.starts_with(&source) && !self.source_walk_skips(&source, &destination) {
            return Err(SyncError::Validation(format!(
                "Destination {} is inside source {}",
                destination.display(),
                source.display()
            )));
        }

        if self.max_hash_bytes == Some(0) {
            return Err(SyncError::Validation(
                "--max-hash-bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the source walk never reaches `destination`
    ///
    /// Both paths are normalized and `destination` lies under `source`.
    fn source_walk_skips(&self, source: &Path, destination: &Path) -> bool {
        let Ok(relative) = destination.strip_prefix(source) else {
            return false;
        };

        let hidden = self.ignore_dotfiles
            && relative
                .components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
        if hidden {
            return true;
        }

        self.ignore_list.iter().any(|entry| {
            let ignored = if entry.is_absolute() {
                normalize(entry)
            } else {
                source.join(entry)
            };
            destination.starts_with(ignored)
        })
    }
}

impl TryFrom<&Cli> for Config {
    type Error = SyncError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let config = Config::from_cli(cli)?;
        config.validate()?;
        Ok(config)
    }
}

/// `<config_dir>/sparsync/config.toml`, when a home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| {
        dirs.config_dir()
            .join(env!("CARGO_PKG_NAME"))
            .join(CONFIG_FILE_NAME)
    })
}

/// `$HOME/work/hd-mirror/tests/<leaf>`
fn default_root(leaf: &str) -> Result<PathBuf, SyncError> {
    let dirs = directories::BaseDirs::new().ok_or_else(|| {
        SyncError::Config(
            "Cannot determine home directory; pass --source and --destination".to_string(),
        )
    })?;
    Ok(dirs
        .home_dir()
        .join("work")
        .join("hd-mirror")
        .join("tests")
        .join(leaf))
}

fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    // Missing destination: resolve its parent so nesting checks still work
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            normalize(parent).join(name)
        }
        _ => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}
