//! Application errors and their process exit codes

use crate::remote::RemoteError;
use std::fmt;
use std::path::PathBuf;
use wrt_config::{ConfigError, ConfigLoadError};

#[derive(Debug)]
pub enum AppError {
    /// No configuration file where one was expected
    MissingConfig(PathBuf),
    /// Configuration exists but is invalid
    Config(ConfigError),
    /// Untracked files in a host backup directory
    UncommittedWork(Vec<String>),
    /// A command on a device failed
    Remote { host: String, source: RemoteError },
    /// A local helper (tar, wget) failed
    LocalCommand {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// A host lacks a field needed to build firmware URLs
    Firmware { host: String, field: &'static str },
    Io(std::io::Error),
    Render(String),
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::UncommittedWork(_) => 2,
            AppError::MissingConfig(_) => 3,
            AppError::Io(err) => err.raw_os_error().filter(|code| *code != 0).unwrap_or(1),
            _ => 1,
        }
    }

    /// Short name used in the final log line
    pub fn kind_name(&self) -> &'static str {
        match self {
            AppError::MissingConfig(_) => "MissingConfig",
            AppError::Config(_) => "Config",
            AppError::UncommittedWork(_) => "UncommittedWork",
            AppError::Remote { .. } => "Remote",
            AppError::LocalCommand { .. } => "LocalCommand",
            AppError::Firmware { .. } => "Firmware",
            AppError::Io(_) => "Io",
            AppError::Render(_) => "Render",
        }
    }

    /// What the user can do about it, when there is something to say
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            AppError::MissingConfig(_) => {
                Some("Create a wrt-backup.yml or point to one with --config / WRT_BACKUP_CONFIG")
            }
            AppError::UncommittedWork(_) => {
                Some("Commit or remove the listed files before running a new backup")
            }
            AppError::Firmware { .. } => {
                Some("Set board_target, board_device and openwrt_version in the host inventory")
            }
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingConfig(path) => {
                write!(f, "Could not find configuration file: {}", path.display())
            }
            AppError::Config(err) => write!(f, "Invalid configuration: {}", err),
            AppError::UncommittedWork(files) => {
                writeln!(f, "Untracked files in the backup directory:")?;
                for file in files {
                    writeln!(f, "Please add, commit or remove from git file: {}", file)?;
                }
                Ok(())
            }
            AppError::Remote { host, source } => write!(f, "{}: {}", host, source),
            AppError::LocalCommand {
                command,
                code,
                stderr,
            } => match code {
                Some(code) => write!(f, "'{}' exited with {}: {}", command, code, stderr.trim()),
                None => write!(f, "'{}' was terminated: {}", command, stderr.trim()),
            },
            AppError::Firmware { host, field } => {
                write!(f, "Host {} has no {} configured", host, field)
            }
            AppError::Io(err) => write!(f, "IO error: {}", err),
            AppError::Render(msg) => write!(f, "Rendering failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Remote { source, .. } => Some(source),
            AppError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigLoadError> for AppError {
    fn from(err: ConfigLoadError) -> Self {
        match err {
            ConfigLoadError::MissingConfig(path) => AppError::MissingConfig(path),
            ConfigLoadError::Io(err) => AppError::Io(err),
            ConfigLoadError::Config(err) => AppError::Config(err),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<time::error::Format> for AppError {
    fn from(err: time::error::Format) -> Self {
        AppError::Render(err.to_string())
    }
}
