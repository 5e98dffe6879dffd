//! Command-line interface for wrt-backup
//! Backs up OpenWrt routers over ssh and decodes their `uci show` dumps.
//!
//! Usage:
//!   wrt-backup [-v] [-c `<config>`] show [--raw] [--keyed] [--positional]
//!   wrt-backup backup [--list]
//!   wrt-backup facts | hosts | fw-show
//!   wrt-backup fw-download [--release `<version>`] [--factory]
//!
//! Every subcommand accepts `-L/--limit host1,host2` and `-F/--format yaml|json|debug`.

mod app;
mod error;
mod firmware;
mod host;
mod local;
mod remote;
mod render;
mod state;

use app::App;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use error::AppError;
use firmware::ImageKind;
use host::ShowOptions;
use render::OutputFormat;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;
use wrt_uci::{DecodeOptions, IndexPlacement};

fn main() {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    if let Err(err) = run(&matches) {
        if let Some(advice) = err.advice() {
            tracing::warn!("{}", advice);
        }
        let rc = err.exit_code();
        tracing::error!("{}", err);
        tracing::error!("wrt-backup exited with: error {}: {}", rc, err.kind_name());
        std::process::exit(rc);
    }
}

fn build_cli() -> Command {
    Command::new("wrt-backup")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Back up OpenWrt routers and inspect their configuration")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase log verbosity (-v info, -vv debug)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file or directory (default: search upwards for wrt-backup.yml)")
                .env("WRT_BACKUP_CONFIG")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("show")
                .about("Show the uci configuration of each host")
                .args(host_args())
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .help("Print the dump without decoding it")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("keyed")
                        .long("keyed")
                        .help("Key anonymous sections by index instead of listing them")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("positional")
                        .long("positional")
                        .help("Place anonymous sections at their declared index")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("backup")
                .about("Back up each host into its directory")
                .args(host_args())
                .arg(
                    Arg::new("list")
                        .long("list")
                        .help("Only list the files the backup would contain")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("facts")
                .about("Collect diagnostic command output from each host")
                .args(host_args()),
        )
        .subcommand(
            Command::new("fw-show")
                .visible_alias("fw_show")
                .about("Show firmware image URLs for each host")
                .args(host_args()),
        )
        .subcommand(
            Command::new("fw-download")
                .visible_alias("fw_download")
                .about("Download the firmware image for each host")
                .args(host_args())
                .arg(
                    Arg::new("release")
                        .long("release")
                        .short('r')
                        .help("OpenWrt release (default: the host's openwrt_version)"),
                )
                .arg(
                    Arg::new("factory")
                        .long("factory")
                        .help("Download the factory image instead of the sysupgrade one")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("hosts")
                .about("List the hosts in the inventory")
                .args(host_args()),
        )
}

/// Arguments shared by every subcommand
fn host_args() -> Vec<Arg> {
    vec![
        Arg::new("limit")
            .long("limit")
            .short('L')
            .help("Only run on these hosts (comma separated)")
            .value_delimiter(',')
            .action(ArgAction::Append),
        Arg::new("format")
            .long("format")
            .short('F')
            .help("Output format")
            .value_parser(value_parser!(OutputFormat))
            .default_value("yaml"),
    ]
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(matches: &ArgMatches) -> Result<(), AppError> {
    let config = matches.get_one::<PathBuf>("config");
    let app = App::load(config.map(PathBuf::as_path))?;

    let (name, sub) = match matches.subcommand() {
        Some(pair) => pair,
        None => return Ok(()),
    };
    let limit: Vec<String> = sub
        .get_many::<String>("limit")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let format = sub
        .get_one::<OutputFormat>("format")
        .copied()
        .unwrap_or_default();

    let output = match name {
        "show" => handle_show_command(&app, &limit, sub, format)?,
        "backup" => {
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            format.render(&app.cmd_backup(&limit, sub.get_flag("list"), now)?)?
        }
        "facts" => format.render(&app.cmd_facts(&limit)?)?,
        "fw-show" => format.render(&app.cmd_fw_show(&limit)?)?,
        "fw-download" => {
            let kind = if sub.get_flag("factory") {
                ImageKind::Factory
            } else {
                ImageKind::Sysupgrade
            };
            let release = sub.get_one::<String>("release").map(String::as_str);
            format.render(&app.cmd_fw_download(&limit, release, kind)?)?
        }
        "hosts" => format.render(&app.cmd_inventory(&limit)?)?,
        _ => unreachable!("clap rejects unknown subcommands"),
    };

    print!("{}", output);
    Ok(())
}

/// Handle the show command
fn handle_show_command(
    app: &App,
    limit: &[String],
    matches: &ArgMatches,
    format: OutputFormat,
) -> Result<String, AppError> {
    let shown = app.cmd_show(limit, show_options(matches))?;
    format.render(&shown)
}

fn show_options(matches: &ArgMatches) -> ShowOptions {
    let placement = if matches.get_flag("positional") {
        IndexPlacement::Positional
    } else {
        IndexPlacement::Append
    };
    ShowOptions {
        raw: matches.get_flag("raw"),
        decode: DecodeOptions::new(!matches.get_flag("keyed")).with_placement(placement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_limit_accepts_comma_list() {
        let matches = build_cli()
            .try_get_matches_from(["wrt-backup", "hosts", "-L", "gw,attic", "--limit", "lab"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let limit: Vec<_> = sub.get_many::<String>("limit").unwrap().collect();
        assert_eq!(limit, vec!["gw", "attic", "lab"]);
    }

    fn show_options_from(args: &[&str]) -> ShowOptions {
        let matches = build_cli()
            .try_get_matches_from(["wrt-backup", "show"].iter().chain(args))
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        show_options(sub)
    }

    #[test]
    fn test_show_flags_select_decode_options() {
        assert_eq!(
            show_options_from(&[]),
            ShowOptions {
                raw: false,
                decode: DecodeOptions::new(true),
            }
        );
        assert_eq!(
            show_options_from(&["--keyed"]).decode,
            DecodeOptions::new(false)
        );
        assert_eq!(
            show_options_from(&["--positional"]).decode,
            DecodeOptions::new(true).with_placement(IndexPlacement::Positional)
        );
        assert!(show_options_from(&["--raw"]).raw);
    }

    #[test]
    fn test_release_short_flag() {
        let matches = build_cli()
            .try_get_matches_from(["wrt-backup", "fw-download", "-r", "22.03.6", "--factory"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("release").map(String::as_str), Some("22.03.6"));
        assert!(sub.get_flag("factory"));
    }

    #[test]
    fn test_underscore_aliases() {
        let matches = build_cli()
            .try_get_matches_from(["wrt-backup", "fw_show", "-F", "json"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "fw-show");
        assert_eq!(sub.get_one::<OutputFormat>("format"), Some(&OutputFormat::Json));
    }

    #[test]
    fn test_verbosity_counts() {
        let matches = build_cli()
            .try_get_matches_from(["wrt-backup", "show", "-vv"])
            .unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
    }
}
