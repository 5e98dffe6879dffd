//! Running commands on devices
//!
//! [`RemoteShell`] is the only thing the rest of the tool knows about a
//! device connection: hand it a command string, get stdout back. [`SshShell`]
//! does that with the system `ssh` client.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use wrt_config::HostConfig;

#[derive(Debug)]
pub enum RemoteError {
    /// The transport could not be started
    Spawn(std::io::Error),
    /// The command ran and exited unsuccessfully
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// Output could not be written locally
    Io(std::io::Error),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Spawn(err) => write!(f, "failed to start ssh: {}", err),
            RemoteError::CommandFailed {
                command,
                code: Some(code),
                stderr,
            } => write!(f, "'{}' exited with {}: {}", command, code, stderr.trim()),
            RemoteError::CommandFailed {
                command, stderr, ..
            } => write!(f, "'{}' was terminated: {}", command, stderr.trim()),
            RemoteError::Io(err) => write!(f, "failed to store output: {}", err),
        }
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RemoteError::Spawn(err) | RemoteError::Io(err) => Some(err),
            RemoteError::CommandFailed { .. } => None,
        }
    }
}

/// A command channel to one device
pub trait RemoteShell {
    /// Run `command` and return its standard output.
    fn run(&self, command: &str) -> Result<String, RemoteError>;

    /// Run `command`, streaming its standard output into `dest`.
    fn run_to_file(&self, command: &str, dest: &Path) -> Result<(), RemoteError>;
}

/// `ssh -l <user> -p <port> <host> <command>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshShell {
    host: String,
    port: u16,
    user: String,
}

impl SshShell {
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
        }
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(&config.host, config.port, &config.user)
    }

    /// Arguments passed to `ssh` ahead of the remote command
    pub fn ssh_args(&self) -> Vec<String> {
        vec![
            "-l".to_string(),
            self.user.clone(),
            "-p".to_string(),
            self.port.to_string(),
            self.host.clone(),
        ]
    }

    fn command(&self, remote: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(self.ssh_args()).arg(remote).stdin(Stdio::null());
        cmd
    }
}

fn check(command: &str, output: Output) -> Result<Output, RemoteError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(RemoteError::CommandFailed {
            command: command.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl RemoteShell for SshShell {
    fn run(&self, command: &str) -> Result<String, RemoteError> {
        tracing::debug!(host = %self.host, command, "running remote command");
        let output = self.command(command).output().map_err(RemoteError::Spawn)?;
        let output = check(command, output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_to_file(&self, command: &str, dest: &Path) -> Result<(), RemoteError> {
        tracing::debug!(host = %self.host, command, dest = %dest.display(), "streaming remote command");
        let file = File::create(dest).map_err(RemoteError::Io)?;
        let output = self
            .command(command)
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .output()
            .map_err(RemoteError::Spawn)?;
        check(command, output).map(|_| ())
    }
}
