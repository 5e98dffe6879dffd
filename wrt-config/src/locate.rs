//! Configuration file discovery
//!
//! Resolution order:
//!
//! 1. an explicit file path is used as is;
//! 2. an explicit directory resolves to `<dir>/wrt-backup.yml`;
//! 3. otherwise (no path, or `AUTO`) the first `wrt-backup.yml` found walking
//!    up from the working directory, falling back to
//!    `$XDG_CONFIG_HOME/wrt-backup/wrt-backup.yml`.

use crate::ConfigLoadError;
use std::env;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "wrt-backup";
pub const CONFIG_NAME: &str = "wrt-backup.yml";

/// Path value requesting the upward search explicitly
pub const AUTO: &str = "AUTO";

#[derive(Debug, Clone)]
pub struct Locator {
    cwd: PathBuf,
    config_home: Option<PathBuf>,
}

impl Locator {
    pub fn new(cwd: impl Into<PathBuf>, config_home: Option<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            config_home,
        }
    }

    /// Locator for the current process: working directory plus the XDG
    /// config home (`$XDG_CONFIG_HOME`, else `$HOME/.config`).
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let cwd = env::current_dir()?;
        let config_home = env::var_os("XDG_CONFIG_HOME")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
        Ok(Self::new(cwd, config_home))
    }

    pub fn locate(&self, path: Option<&Path>) -> Result<PathBuf, ConfigLoadError> {
        let candidate = match path.filter(|p| !is_auto(p)) {
            Some(path) if path.is_dir() => path.join(CONFIG_NAME),
            Some(path) => path.to_path_buf(),
            None => {
                if let Some(found) = self.find_up() {
                    return Ok(found);
                }
                self.default_location()
            }
        };

        if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(ConfigLoadError::MissingConfig(candidate))
        }
    }

    /// First `wrt-backup.yml` in the working directory or its parents
    fn find_up(&self) -> Option<PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(CONFIG_NAME))
            .find(|candidate| candidate.is_file())
    }

    fn default_location(&self) -> PathBuf {
        match &self.config_home {
            Some(home) => home.join(APP_NAME).join(CONFIG_NAME),
            None => PathBuf::from(CONFIG_NAME),
        }
    }
}

fn is_auto(path: &Path) -> bool {
    path.as_os_str().is_empty() || path == Path::new(AUTO)
}
