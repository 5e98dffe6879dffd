//! Diagnostics snapshot taken from a device before a backup

use indexmap::IndexMap;

/// Commands captured for a snapshot, in report order
pub const DIAGNOSTIC_COMMANDS: &[(&str, &str)] = &[
    ("board_cfg", "cat /etc/board.json"),
    ("release", "cat /etc/os-release"),
    ("df", "df -h"),
    ("ip_addresses", "ip a"),
    ("ip_route", "ip route"),
    ("backup_files", "sysupgrade -l"),
    ("uci_export", "uci export"),
    ("uci_show", "uci show"),
];

/// Markdown report: one fenced block per command.
pub fn render_markdown(name: &str, address: &str, outputs: &IndexMap<String, String>) -> String {
    let mut parts = vec![format!("# Configuration for {}/{}\n", name, address)];
    for (command, output) in outputs {
        parts.push(format!("\n## {}\n\n", command));
        parts.push("```".to_string());
        parts.push(output.clone());
        parts.push("```".to_string());
    }

    let mut report = parts.join("\n");
    report.push('\n');
    report
}

pub fn render_json(outputs: &IndexMap<String, String>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs() -> IndexMap<String, String> {
        IndexMap::from([
            ("df".to_string(), "Filesystem Size\n".to_string()),
            ("ip_route".to_string(), "default via 10.0.0.1\n".to_string()),
        ])
    }

    #[test]
    fn test_markdown_report() {
        let report = render_markdown("gw", "10.0.0.1", &outputs());
        assert_eq!(
            report,
            "# Configuration for gw/10.0.0.1\n\n\n## df\n\n\n```\nFilesystem Size\n\n```\n\n## ip_route\n\n\n```\ndefault via 10.0.0.1\n\n```\n"
        );
    }

    #[test]
    fn test_json_report_keeps_command_order() {
        let json = render_json(&outputs()).unwrap();
        assert!(json.find("\"df\"").unwrap() < json.find("\"ip_route\"").unwrap());
    }

    #[test]
    fn test_command_names_are_unique() {
        let mut names: Vec<_> = DIAGNOSTIC_COMMANDS.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DIAGNOSTIC_COMMANDS.len());
    }
}
