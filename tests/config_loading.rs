mod common;
use crate::common::{ProjectDirBuilder, TestResult};

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use autorunner::config::{self, ConfigFile};
use autorunner::errors::AutorunnerError;
use autorunner::project::PackageManager;

fn toml_file(contents: &str) -> Result<NamedTempFile, std::io::Error> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

#[test]
fn full_file_is_parsed() -> TestResult {
    let file = toml_file(
        r#"
        [watch]
        poll_interval_ms = 500
        extensions = [".ts", ".vue"]
        exclude_dirs = ["node_modules", "coverage"]

        [project]
        package_manager = "pnpm"
        dependency_dir = "node_modules"
        "#,
    )?;

    let cfg = config::load_and_validate(file.path())?;
    let settings = cfg.watch_settings();

    assert_eq!(settings.poll_interval, Duration::from_millis(500));
    assert!(settings.is_tracked("App.vue"));
    assert!(!settings.is_tracked("App.jsx"));
    assert!(settings.is_excluded_dir("coverage"));
    assert!(!settings.is_excluded_dir("dist"));
    assert_eq!(cfg.project.package_manager, Some(PackageManager::Pnpm));
    Ok(())
}

#[test]
fn empty_file_means_defaults() -> TestResult {
    let file = toml_file("")?;
    let cfg = config::load_and_validate(file.path())?;
    assert_eq!(cfg, ConfigFile::default());
    assert_eq!(cfg.watch_settings(), autorunner::watch::WatchSettings::default());
    Ok(())
}

#[test]
fn unknown_keys_and_managers_are_parse_errors() -> TestResult {
    let typo = toml_file("[watch]\npoll_interval = 10\n")?;
    assert!(matches!(
        config::load_and_validate(typo.path()),
        Err(AutorunnerError::TomlError(_))
    ));

    let manager = toml_file("[project]\npackage_manager = \"deno\"\n")?;
    assert!(matches!(
        config::load_and_validate(manager.path()),
        Err(AutorunnerError::TomlError(_))
    ));
    Ok(())
}

#[test]
fn invalid_values_are_config_errors() -> TestResult {
    let file = toml_file("[watch]\npoll_interval_ms = 0\n")?;
    let err = config::load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, AutorunnerError::ConfigError(_)));
    Ok(())
}

#[test]
fn resolve_uses_project_file_when_present() -> TestResult {
    let dir = ProjectDirBuilder::new()
        .file("autorunner.toml", "[project]\npackage_manager = \"bun\"\n")
        .build()?;

    let cfg = config::resolve(None, dir.path())?;
    assert_eq!(cfg.project.package_manager, Some(PackageManager::Bun));
    Ok(())
}

#[test]
fn resolve_falls_back_to_defaults_without_file() -> TestResult {
    let dir = ProjectDirBuilder::new().build()?;
    assert_eq!(config::resolve(None, dir.path())?, ConfigFile::default());
    Ok(())
}

#[test]
fn explicit_missing_config_is_an_error() -> TestResult {
    let dir = ProjectDirBuilder::new().build()?;
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        config::resolve(Some(missing.as_path()), dir.path()),
        Err(AutorunnerError::IoError(_))
    ));
    Ok(())
}
