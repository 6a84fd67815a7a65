//! Configuration
//!
//! Paths used by the command-line front end. Every default can be derived from
//! two roots, the working directory and the EPM home (`$EPM_HOME` or `~/.epm`);
//! an optional `<home>/config.toml` overrides the storage locations.
//!
//! ```toml
//! store_dir = "/var/cache/epm/store"
//! registry_dir = "registry"                      # relative to the home
//! installed_packages_directory = "vendor/epm"    # relative to the working directory
//! ```

use crate::manifest::MANIFEST_FILENAME;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the EPM home
pub const HOME_ENV: &str = "EPM_HOME";

/// Settings file name inside the EPM home
pub const SETTINGS_FILENAME: &str = "config.toml";

/// Default install directory name, relative to the working directory
pub const INSTALLED_PACKAGES_DIRNAME: &str = "installed_contracts";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `$EPM_HOME` nor a home directory is available
    #[error("Cannot determine EPM home: set EPM_HOME")]
    NoHome,

    /// Failed to determine the working directory
    #[error("Cannot determine working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),

    /// Failed to read the settings file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for [`Settings`]
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `<home>/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Blob store root (relative paths resolve against the home)
    pub store_dir: Option<PathBuf>,

    /// Directory registry root (relative paths resolve against the home)
    pub registry_dir: Option<PathBuf>,

    /// Install destination (relative paths resolve against the working directory)
    pub installed_packages_directory: Option<PathBuf>,
}

impl Settings {
    /// Read a settings file; a missing file yields empty settings
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved paths for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpmConfig {
    pub working_directory: PathBuf,
    pub manifest_file: PathBuf,
    pub installed_packages_directory: PathBuf,
    pub home: PathBuf,
    pub store_dir: PathBuf,
    pub registry_dir: PathBuf,
}

impl EpmConfig {
    /// Defaults derived from a working directory and an EPM home
    pub fn new(working_directory: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        let working_directory = working_directory.into();
        let home = home.into();

        Self {
            manifest_file: working_directory.join(MANIFEST_FILENAME),
            installed_packages_directory: working_directory.join(INSTALLED_PACKAGES_DIRNAME),
            store_dir: home.join("store"),
            registry_dir: home.join("registry"),
            working_directory,
            home,
        }
    }

    /// Configuration for the current process: working directory, EPM home and
    /// the home's settings file
    pub fn load() -> Result<Self, ConfigError> {
        let working_directory = std::env::current_dir().map_err(ConfigError::WorkingDirectory)?;
        let home = default_home()?;
        let settings = Settings::read(&home.join(SETTINGS_FILENAME))?;
        Ok(Self::new(working_directory, home).with_settings(settings))
    }

    /// Apply overrides from a settings file
    pub fn with_settings(mut self, settings: Settings) -> Self {
        if let Some(store_dir) = settings.store_dir {
            self.store_dir = self.home.join(store_dir);
        }
        if let Some(registry_dir) = settings.registry_dir {
            self.registry_dir = self.home.join(registry_dir);
        }
        if let Some(installed) = settings.installed_packages_directory {
            self.installed_packages_directory = self.working_directory.join(installed);
        }
        self
    }

    /// Use another manifest file (relative to the working directory)
    pub fn with_manifest_file(mut self, path: impl AsRef<Path>) -> Self {
        self.manifest_file = self.working_directory.join(path);
        self
    }

    /// Install into another directory (relative to the working directory)
    pub fn with_installed_packages_directory(mut self, path: impl AsRef<Path>) -> Self {
        self.installed_packages_directory = self.working_directory.join(path);
        self
    }

    /// Directory that manifest `sources` are relative to
    pub fn base_path(&self) -> PathBuf {
        self.manifest_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.working_directory.clone())
    }
}

/// `$EPM_HOME`, or `~/.epm`
pub fn default_home() -> Result<PathBuf, ConfigError> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(".epm"))
        .ok_or(ConfigError::NoHome)
}
