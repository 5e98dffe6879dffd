//! Configuration loader for wrt-backup.
//!
//! `defaults/wrt-backup.default.yml` is embedded into the binary so that the
//! documented defaults and runtime behavior stay in sync. A project's
//! `wrt-backup.yml` is layered over those defaults via [`Loader`] before
//! deserializing into [`WrtConfig`]. Finding that file is [`Locator`]'s job.
//!
//! The `config` crate folds map keys to lowercase, so the inventory is read
//! from the user's files a second time with `serde_yaml` to keep host names
//! exactly as written.

mod locate;

pub use config::ConfigError;
pub use locate::{Locator, APP_NAME, AUTO, CONFIG_NAME};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_YAML: &str = include_str!("../defaults/wrt-backup.default.yml");

/// Prefix for environment overrides, e.g. `WRT_BACKUP_BACKUP__STATE_FORMAT=json`
pub const ENV_PREFIX: &str = "WRT_BACKUP";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WrtConfig {
    /// Devices to back up, in file order
    #[serde(default)]
    pub inventory: IndexMap<String, HostConfig>,
    pub backup: BackupConfig,
    pub firmware: FirmwareConfig,
}

/// One inventory entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostConfig {
    /// Address or hostname reachable over ssh
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    /// Pass `-o` to sysupgrade so every changed file is included
    #[serde(default)]
    pub backup_all: bool,
    /// Capture a diagnostics snapshot before the backup
    #[serde(default)]
    pub backup_state: bool,
    #[serde(default)]
    pub board_target: Option<String>,
    #[serde(default)]
    pub board_device: Option<String>,
    #[serde(default)]
    pub openwrt_version: Option<String>,
}

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    "root".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    pub state_format: StateFormat,
    pub extract_dir: String,
    pub archive_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateFormat {
    Markdown,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FirmwareConfig {
    /// Base URL of the release tree, without trailing slash
    pub mirror: String,
    pub dir: String,
}

/// Error raised while finding or reading the configuration
#[derive(Debug)]
pub enum ConfigLoadError {
    /// No configuration file at the resolved location
    MissingConfig(PathBuf),
    /// The working directory could not be determined
    Io(std::io::Error),
    /// The file exists but could not be parsed or deserialized
    Config(ConfigError),
}

impl fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLoadError::MissingConfig(path) => {
                write!(f, "Could not find configuration file: {}", path.display())
            }
            ConfigLoadError::Io(err) => write!(f, "IO error: {}", err),
            ConfigLoadError::Config(err) => write!(f, "Invalid configuration: {}", err),
        }
    }
}

impl std::error::Error for ConfigLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigLoadError::MissingConfig(_) => None,
            ConfigLoadError::Io(err) => Some(err),
            ConfigLoadError::Config(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ConfigLoadError {
    fn from(err: ConfigError) -> Self {
        ConfigLoadError::Config(err)
    }
}

impl From<std::io::Error> for ConfigLoadError {
    fn from(err: std::io::Error) -> Self {
        ConfigLoadError::Io(err)
    }
}

/// Only the inventory, with keys untouched
#[derive(Debug, Default, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    inventory: Option<IndexMap<String, HostConfig>>,
}

/// Helper for layering user files and overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
    files: Vec<PathBuf>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_YAML, FileFormat::Yaml));
        Self {
            builder,
            files: Vec::new(),
        }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Yaml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Layer `WRT_BACKUP_*` environment variables; `__` separates nested keys.
    pub fn with_env(mut self) -> Self {
        let source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__");
        self.builder = self.builder.add_source(source);
        self
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<WrtConfig, ConfigError> {
        let mut config: WrtConfig = self.builder.build()?.try_deserialize()?;
        if !self.files.is_empty() {
            config.inventory = read_inventory(&self.files)?;
        }
        Ok(config)
    }
}

/// Inventory entries from `files`, later files replacing earlier hosts.
fn read_inventory(files: &[PathBuf]) -> Result<IndexMap<String, HostConfig>, ConfigError> {
    let mut inventory = IndexMap::new();
    for path in files {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Foreign(Box::new(e)))?;
        if text.trim().is_empty() {
            continue;
        }
        let file: InventoryFile =
            serde_yaml::from_str(&text).map_err(|e| ConfigError::Foreign(Box::new(e)))?;
        inventory.extend(file.inventory.unwrap_or_default());
    }
    Ok(inventory)
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// A loaded configuration together with where it came from
#[derive(Debug, Clone)]
pub struct Project {
    pub config_file: PathBuf,
    /// Directory holding the configuration file; host directories live here
    pub root: PathBuf,
    pub config: WrtConfig,
}

impl Project {
    /// Locate and load the project configuration.
    ///
    /// `path` may be a file, a directory containing `wrt-backup.yml`, or
    /// `None`/`AUTO` to search upwards from the working directory.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let locator = Locator::from_env()?;
        let config_file = locator.locate(path)?;
        Self::from_file(config_file)
    }

    /// Load a project from a known configuration file.
    pub fn from_file(config_file: PathBuf) -> Result<Self, ConfigLoadError> {
        tracing::debug!(path = %config_file.display(), "loading configuration");
        let config = Loader::new().with_file(&config_file).with_env().build()?;
        let root = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            config_file,
            root,
            config,
        })
    }

    /// Directory holding everything backed up for `host`
    pub fn host_dir(&self, host: &str) -> PathBuf {
        self.root.join(host)
    }
}
