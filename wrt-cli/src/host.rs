//! Per-device operations

use crate::error::AppError;
use crate::firmware::{FirmwareTarget, FirmwareUrls, ImageKind};
use crate::local;
use crate::remote::RemoteShell;
use crate::state::{self, DIAGNOSTIC_COMMANDS};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;
use wrt_config::{BackupConfig, FirmwareConfig, HostConfig, StateFormat};
use wrt_uci::{DecodeOptions, Document};

/// How `uci show` output is returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowOptions {
    /// Skip decoding and return the dump as text
    pub raw: bool,
    pub decode: DecodeOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UciOutput {
    Structured(Document),
    Raw(String),
}

/// Where a backup run left its files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupReport {
    pub archive: PathBuf,
    pub extracted_to: PathBuf,
    pub state_file: Option<PathBuf>,
}

pub struct Host {
    pub name: String,
    pub config: HostConfig,
    /// Local directory holding this host's backups
    pub dir: PathBuf,
    shell: Box<dyn RemoteShell>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl Host {
    pub fn new(
        name: impl Into<String>,
        config: HostConfig,
        dir: PathBuf,
        shell: Box<dyn RemoteShell>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            dir,
            shell,
        }
    }

    fn remote(&self, command: &str) -> Result<String, AppError> {
        self.shell.run(command).map_err(|source| AppError::Remote {
            host: self.name.clone(),
            source,
        })
    }

    pub fn uci_show(&self, options: ShowOptions) -> Result<UciOutput, AppError> {
        let dump = self.remote("uci show")?;
        if options.raw {
            return Ok(UciOutput::Raw(dump));
        }
        Ok(UciOutput::Structured(wrt_uci::decode_with(
            &dump,
            options.decode,
        )))
    }

    /// Output of every diagnostic command, keyed by command name
    pub fn facts(&self) -> Result<IndexMap<String, String>, AppError> {
        let mut outputs = IndexMap::new();
        for (name, command) in DIAGNOSTIC_COMMANDS {
            outputs.insert(name.to_string(), self.remote(command)?);
        }
        Ok(outputs)
    }

    /// Files `sysupgrade -b` would include
    pub fn list_backup_files(&self) -> Result<Vec<String>, AppError> {
        let out = self.remote("sysupgrade -l")?;
        Ok(out
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Write the diagnostics snapshot into the host directory.
    pub fn capture_state(&self, format: StateFormat) -> Result<PathBuf, AppError> {
        let outputs = self.facts()?;
        let (dest, body) = match format {
            StateFormat::Markdown => (
                self.dir.join("state.md"),
                state::render_markdown(&self.name, &self.config.host, &outputs),
            ),
            StateFormat::Json => (
                self.dir.join("state.json"),
                state::render_json(&outputs).map_err(|e| AppError::Render(e.to_string()))?,
            ),
        };

        fs::write(&dest, body)?;
        tracing::info!(host = %self.name, path = %dest.display(), "created state file");
        Ok(dest)
    }

    fn backup_command(&self) -> &'static str {
        if self.config.backup_all {
            "sysupgrade -b - -k -o"
        } else {
            "sysupgrade -b - -k"
        }
    }

    /// Pull a configuration backup, unpack it and archive the tarball.
    pub fn backup(
        &self,
        settings: &BackupConfig,
        now: OffsetDateTime,
    ) -> Result<BackupReport, AppError> {
        fs::create_dir_all(&self.dir)?;
        local::check_git_status(&self.dir)?;

        let state_file = if self.config.backup_state {
            Some(self.capture_state(settings.state_format)?)
        } else {
            None
        };

        let download = self.dir.join(format!("backup-{}.tar.gz", self.name));
        let stored = self.store_backup(&download, settings, now);
        if stored.is_err() && download.exists() {
            if let Err(err) = fs::remove_file(&download) {
                tracing::warn!(path = %download.display(), error = %err, "could not remove partial backup");
            }
        }

        let (archive, extracted_to) = stored?;
        Ok(BackupReport {
            archive,
            extracted_to,
            state_file,
        })
    }

    /// Download the tarball to `download`, extract it and move it to the
    /// archive directory. Returns the archive path and the extraction dir.
    fn store_backup(
        &self,
        download: &Path,
        settings: &BackupConfig,
        now: OffsetDateTime,
    ) -> Result<(PathBuf, PathBuf), AppError> {
        tracing::info!(host = %self.name, "starting device backup");
        self.shell
            .run_to_file(self.backup_command(), download)
            .map_err(|source| AppError::Remote {
                host: self.name.clone(),
                source,
            })?;

        let extracted_to = self.dir.join(&settings.extract_dir);
        fs::create_dir_all(&extracted_to)?;
        tracing::debug!(dest = %extracted_to.display(), "extracting backup");
        local::extract_archive(download, &extracted_to)?;

        let archive_dir = self.dir.join(&settings.archive_dir);
        fs::create_dir_all(&archive_dir)?;
        let archive = archive_dir.join(archive_name(&self.name, now)?);
        fs::rename(download, &archive)?;
        tracing::debug!(path = %archive.display(), "saved backup archive");

        Ok((archive, extracted_to))
    }

    fn firmware_target<'a>(
        &'a self,
        release: Option<&'a str>,
    ) -> Result<FirmwareTarget<'a>, AppError> {
        let missing = |field| AppError::Firmware {
            host: self.name.clone(),
            field,
        };

        Ok(FirmwareTarget {
            version: release
                .or(self.config.openwrt_version.as_deref())
                .ok_or_else(|| missing("openwrt_version"))?,
            target: self
                .config
                .board_target
                .as_deref()
                .ok_or_else(|| missing("board_target"))?,
            device: self
                .config
                .board_device
                .as_deref()
                .ok_or_else(|| missing("board_device"))?,
        })
    }

    pub fn firmware_urls(&self, firmware: &FirmwareConfig) -> Result<FirmwareUrls, AppError> {
        Ok(self.firmware_target(None)?.urls(&firmware.mirror))
    }

    /// Fetch one image into the host's firmware directory.
    pub fn download_firmware(
        &self,
        firmware: &FirmwareConfig,
        release: Option<&str>,
        kind: ImageKind,
    ) -> Result<PathBuf, AppError> {
        let target = self.firmware_target(release)?;
        let dest_dir = self.dir.join(&firmware.dir);
        fs::create_dir_all(&dest_dir)?;

        let dest = dest_dir.join(target.image_name(kind));
        local::download(&target.image_url(&firmware.mirror, kind), &dest)?;
        tracing::info!(host = %self.name, path = %dest.display(), "firmware downloaded");
        Ok(dest)
    }
}

fn archive_name(host: &str, now: OffsetDateTime) -> Result<String, AppError> {
    let stamp = now.format(format_description!(
        "[year][month][day]-[hour][minute][second]"
    ))?;
    Ok(format!("{}-{}.tar.gz", host, stamp))
}
