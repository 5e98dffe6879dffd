use std::fs;
use std::path::{Path, PathBuf};
use wrt_config::{ConfigLoadError, Locator, AUTO, CONFIG_NAME};

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "inventory: {}\n").unwrap();
}

#[test]
fn explicit_file_is_used_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("fleet.yml");
    touch(&file);

    let locator = Locator::new(dir.path(), None);
    assert_eq!(locator.locate(Some(&file)).unwrap(), file);
}

#[test]
fn explicit_directory_resolves_config_name() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join(CONFIG_NAME);
    touch(&file);

    let locator = Locator::new("/", None);
    assert_eq!(locator.locate(Some(dir.path())).unwrap(), file);
}

#[test]
fn searches_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join(CONFIG_NAME);
    touch(&file);
    let nested = dir.path().join("gateway").join("config");
    fs::create_dir_all(&nested).unwrap();

    let locator = Locator::new(&nested, None);
    assert_eq!(locator.locate(None).unwrap(), file);
    assert_eq!(locator.locate(Some(Path::new(AUTO))).unwrap(), file);
}

#[test]
fn falls_back_to_config_home() {
    let cwd = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("wrt-backup").join(CONFIG_NAME);
    touch(&file);

    let locator = Locator::new(cwd.path(), Some(home.path().to_path_buf()));
    assert_eq!(locator.locate(None).unwrap(), file);
}

#[test]
fn missing_config_reports_expected_path() {
    let cwd = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();

    let locator = Locator::new(cwd.path(), Some(home.path().to_path_buf()));
    match locator.locate(None) {
        Err(ConfigLoadError::MissingConfig(path)) => {
            assert_eq!(path, home.path().join("wrt-backup").join(CONFIG_NAME));
        }
        other => panic!("expected MissingConfig, got {:?}", other),
    }

    let absent = PathBuf::from(cwd.path()).join("absent.yml");
    assert!(matches!(
        locator.locate(Some(&absent)),
        Err(ConfigLoadError::MissingConfig(path)) if path == absent
    ));
}
