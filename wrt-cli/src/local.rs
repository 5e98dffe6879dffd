//! Local helper programs: git, tar and wget

use crate::error::AppError;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

/// Run a local program and return its stdout.
pub fn run<I, S>(program: &str, args: I, cwd: Option<&Path>) -> Result<String, AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let rendered = format!("{:?}", cmd);
    tracing::debug!(command = %rendered, "running local command");
    let output = cmd.output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(AppError::LocalCommand {
            command: rendered,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Refuse to overwrite a backup directory holding untracked files.
///
/// A directory outside any git work tree, or a machine without git, is not
/// checked. Any other git failure is an error.
pub fn check_git_status(dir: &Path) -> Result<(), AppError> {
    let porcelain = match run("git", ["status", "--porcelain", "."], Some(dir)) {
        Ok(out) => out,
        Err(err) if outside_git(&err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "skipping git status check");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let untracked = untracked_files(&porcelain);
    if untracked.is_empty() {
        Ok(())
    } else {
        Err(AppError::UncommittedWork(untracked))
    }
}

fn outside_git(err: &AppError) -> bool {
    match err {
        AppError::Io(io) => io.kind() == ErrorKind::NotFound,
        AppError::LocalCommand { stderr, .. } => stderr.contains("not a git repository"),
        _ => false,
    }
}

/// Paths reported as untracked (`??`) in `git status --porcelain` output
pub fn untracked_files(porcelain: &str) -> Vec<String> {
    porcelain
        .lines()
        .filter_map(|line| {
            let (state, path) = line.split_once(' ')?;
            state.starts_with('?').then(|| path.trim().to_string())
        })
        .filter(|path| !path.is_empty())
        .collect()
}

/// Extract a tar archive into `dest`.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), AppError> {
    run(
        "tar",
        [OsStr::new("-xf"), archive.as_os_str(), OsStr::new("-C"), dest.as_os_str()],
        None,
    )
    .map(|_| ())
}

/// Download `url` to `dest`.
pub fn download(url: &str, dest: &Path) -> Result<(), AppError> {
    tracing::debug!(url, "downloading");
    run("wget", [OsStr::new("-O"), dest.as_os_str(), OsStr::new(url)], None).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untracked_files() {
        let porcelain = "\
?? state.md
 M config/etc/config/network
M  archives/gw-20240101-000000.tar.gz
?? config/etc/dropbear/
";
        assert_eq!(untracked_files(porcelain), vec!["state.md", "config/etc/dropbear/"]);
    }

    #[test]
    fn test_clean_tree_has_no_untracked_files() {
        assert!(untracked_files("").is_empty());
        assert!(untracked_files(" M state.md\n").is_empty());
    }

    #[test]
    fn test_failed_local_command_reports_status() {
        let err = run("sh", ["-c", "echo nope >&2; exit 4"], None).unwrap_err();
        match err {
            AppError::LocalCommand { code, stderr, .. } => {
                assert_eq!(code, Some(4));
                assert_eq!(stderr.trim(), "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_git_check_outside_repository_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_git_status(dir.path()).is_ok());
    }

    fn git_repo() -> Option<tempfile::TempDir> {
        let dir = tempfile::tempdir().unwrap();
        run("git", ["init", "-q", "."], Some(dir.path())).ok()?;
        Some(dir)
    }

    #[test]
    fn test_git_check_reports_untracked_files() {
        let Some(repo) = git_repo() else { return };
        std::fs::write(repo.path().join("state.md"), "# state\n").unwrap();

        match check_git_status(repo.path()) {
            Err(AppError::UncommittedWork(files)) => assert_eq!(files, vec!["state.md"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_git_failure_inside_repository_is_an_error() {
        let Some(repo) = git_repo() else { return };
        std::fs::write(repo.path().join("state.md"), "# state\n").unwrap();
        std::fs::write(repo.path().join(".git/index"), b"garbage").unwrap();

        let err = check_git_status(repo.path()).unwrap_err();
        assert!(matches!(err, AppError::LocalCommand { .. }), "got {err}");
    }

    #[test]
    fn test_missing_git_binary_counts_as_outside_git() {
        let missing = AppError::Io(std::io::Error::from(ErrorKind::NotFound));
        assert!(outside_git(&missing));

        let denied = AppError::Io(std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(!outside_git(&denied));
    }
}
