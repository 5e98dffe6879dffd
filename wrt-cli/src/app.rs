//! Inventory-wide commands
//!
//! [`App`] owns one [`Host`] per inventory entry, in file order, and runs a
//! command over the hosts selected by `--limit`. The first failing host
//! aborts the command.

use crate::error::AppError;
use crate::firmware::{FirmwareUrls, ImageKind};
use crate::host::{BackupReport, Host, ShowOptions, UciOutput};
use crate::remote::{RemoteShell, SshShell};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use wrt_config::{HostConfig, Project};

/// Result of `backup` for one host
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BackupOutcome {
    /// `--list`: files that would be saved
    Files(Vec<String>),
    Archived(BackupReport),
}

#[derive(Debug)]
pub struct App {
    pub project: Project,
    hosts: Vec<Host>,
}

impl App {
    /// Locate the configuration and connect every host over ssh.
    pub fn load(config: Option<&Path>) -> Result<Self, AppError> {
        let project = Project::load(config)?;
        tracing::debug!(path = %project.config_file.display(), "configuration loaded");
        Ok(Self::with_shells(project, |_, host| {
            Box::new(SshShell::from_config(host))
        }))
    }

    /// Build hosts using `connect` to open each device's shell.
    pub fn with_shells<F>(project: Project, mut connect: F) -> Self
    where
        F: FnMut(&str, &HostConfig) -> Box<dyn RemoteShell>,
    {
        let hosts = project
            .config
            .inventory
            .iter()
            .map(|(name, config)| {
                Host::new(
                    name.as_str(),
                    config.clone(),
                    project.host_dir(name),
                    connect(name, config),
                )
            })
            .collect();

        Self { project, hosts }
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Hosts named in `limit`, or all of them when it is empty
    fn select(&self, limit: &[String]) -> Vec<&Host> {
        for name in limit {
            if !self.hosts.iter().any(|host| &host.name == name) {
                tracing::warn!(host = %name, "no such host in inventory");
            }
        }

        self.hosts()
            .iter()
            .filter(|host| limit.is_empty() || limit.contains(&host.name))
            .inspect(|host| tracing::info!(host = %host.name, "selected host"))
            .collect()
    }

    fn each<T, F>(&self, limit: &[String], mut run: F) -> Result<IndexMap<String, T>, AppError>
    where
        F: FnMut(&Host) -> Result<T, AppError>,
    {
        let mut results = IndexMap::new();
        for host in self.select(limit) {
            results.insert(host.name.clone(), run(host)?);
        }
        Ok(results)
    }

    pub fn cmd_inventory(&self, limit: &[String]) -> Result<IndexMap<String, HostConfig>, AppError> {
        self.each(limit, |host| Ok(host.config.clone()))
    }

    pub fn cmd_show(
        &self,
        limit: &[String],
        options: ShowOptions,
    ) -> Result<IndexMap<String, UciOutput>, AppError> {
        self.each(limit, |host| host.uci_show(options))
    }

    pub fn cmd_facts(
        &self,
        limit: &[String],
    ) -> Result<IndexMap<String, IndexMap<String, String>>, AppError> {
        self.each(limit, Host::facts)
    }

    pub fn cmd_backup(
        &self,
        limit: &[String],
        list_files: bool,
        now: OffsetDateTime,
    ) -> Result<IndexMap<String, BackupOutcome>, AppError> {
        let settings = &self.project.config.backup;
        self.each(limit, |host| {
            if list_files {
                host.list_backup_files().map(BackupOutcome::Files)
            } else {
                host.backup(settings, now).map(BackupOutcome::Archived)
            }
        })
    }

    pub fn cmd_fw_show(&self, limit: &[String]) -> Result<IndexMap<String, FirmwareUrls>, AppError> {
        let firmware = &self.project.config.firmware;
        self.each(limit, |host| host.firmware_urls(firmware))
    }

    pub fn cmd_fw_download(
        &self,
        limit: &[String],
        release: Option<&str>,
        kind: ImageKind,
    ) -> Result<IndexMap<String, PathBuf>, AppError> {
        let firmware = &self.project.config.firmware;
        self.each(limit, |host| host.download_firmware(firmware, release, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::scripted::ScriptedShell;
    use std::fs;
    use wrt_config::CONFIG_NAME;

    const CONFIG: &str = "\
inventory:
  gateway:
    host: 10.0.0.1
    board_target: ath79/generic
    board_device: tplink_archer-c7-v2
    openwrt_version: 23.05.3
  attic:
    host: 10.0.0.2
";

    fn app_with(dir: &Path, dump: &'static str) -> App {
        let path = dir.join(CONFIG_NAME);
        fs::write(&path, CONFIG).unwrap();
        let project = Project::from_file(path).unwrap();

        App::with_shells(project, |_, _| {
            Box::new(
                ScriptedShell::new()
                    .with_output("uci show", dump)
                    .with_output("sysupgrade -l", "/etc/config/network\n"),
            )
        })
    }

    fn limit(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_hosts_follow_inventory_order() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(dir.path(), "");

        let names: Vec<_> = app.hosts().iter().map(|host| host.name.as_str()).collect();
        assert_eq!(names, vec!["gateway", "attic"]);
        assert_eq!(app.hosts()[1].dir, dir.path().join("attic"));
    }

    #[test]
    fn test_limit_selects_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(dir.path(), "");

        let inventory = app.cmd_inventory(&limit(&["attic", "missing"])).unwrap();
        let names: Vec<_> = inventory.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["attic"]);

        assert_eq!(app.cmd_inventory(&[]).unwrap().len(), 2);
    }

    #[test]
    fn test_show_decodes_every_host() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(
            dir.path(),
            "system.@system[0]=system\nsystem.@system[0].hostname='OpenWrt'\n",
        );

        let options = ShowOptions {
            raw: false,
            decode: wrt_uci::DecodeOptions::new(true),
        };
        let shown = app.cmd_show(&[], options).unwrap();
        assert_eq!(shown.len(), 2);

        let json = serde_json::to_value(&shown).unwrap();
        assert_eq!(json["gateway"]["system"]["system"][0]["hostname"], "OpenWrt");
    }

    #[test]
    fn test_backup_list_files() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(dir.path(), "");

        let outcome = app
            .cmd_backup(&limit(&["gateway"]), true, OffsetDateTime::UNIX_EPOCH)
            .unwrap();
        match &outcome["gateway"] {
            BackupOutcome::Files(files) => assert_eq!(files, &vec!["/etc/config/network"]),
            BackupOutcome::Archived(_) => panic!("expected a file listing"),
        }
    }

    #[test]
    fn test_fw_show_fails_on_incomplete_host() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(dir.path(), "");

        let urls = app.cmd_fw_show(&limit(&["gateway"])).unwrap();
        assert!(urls["gateway"]
            .sysupgrade
            .ends_with("openwrt-23.05.3-tplink_archer-c7-v2-squashfs-sysupgrade.bin"));

        let err = app.cmd_fw_show(&[]).unwrap_err();
        assert!(matches!(err, AppError::Firmware { ref host, .. } if host == "attic"));
    }
}
