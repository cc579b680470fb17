// src/config/validate.rs

use crate::config::model::{ConfigFile, ProjectSection, RawConfigFile, WatchSection};
use crate::errors::{AutorunnerError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AutorunnerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_watch(&raw.watch)?;
        validate_project(&raw.project)?;
        Ok(ConfigFile::new_unchecked(raw.watch, raw.project))
    }
}

fn validate_watch(watch: &WatchSection) -> Result<()> {
    if watch.poll_interval_ms == 0 {
        return Err(AutorunnerError::ConfigError(
            "[watch].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if watch.extensions.is_empty() {
        return Err(AutorunnerError::ConfigError(
            "[watch].extensions must list at least one suffix".to_string(),
        ));
    }

    for ext in &watch.extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(AutorunnerError::ConfigError(format!(
                "[watch].extensions entry '{ext}' must look like \".ts\""
            )));
        }
    }

    for dir in &watch.exclude_dirs {
        ensure_plain_name("[watch].exclude_dirs", dir)?;
    }

    Ok(())
}

fn validate_project(project: &ProjectSection) -> Result<()> {
    ensure_plain_name("[project].dependency_dir", &project.dependency_dir)
}

/// Directory names are matched against single path components, so they
/// cannot contain separators.
fn ensure_plain_name(key: &str, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(AutorunnerError::ConfigError(format!(
            "{key} entry '{name}' must be a plain directory name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg, ConfigFile::default());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.watch.poll_interval_ms = 0;
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn extension_without_dot_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.watch.extensions = vec!["ts".to_string()];
        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(AutorunnerError::ConfigError(_))
        ));
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.watch.extensions.clear();
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn nested_exclude_path_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.watch.exclude_dirs = vec!["packages/dist".to_string()];
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn empty_exclude_list_is_allowed() {
        let mut raw = RawConfigFile::default();
        raw.watch.exclude_dirs.clear();
        assert!(ConfigFile::try_from(raw).is_ok());
    }

    #[test]
    fn dependency_dir_must_be_a_name() {
        let mut raw = RawConfigFile::default();
        raw.project.dependency_dir = "..".to_string();
        assert!(ConfigFile::try_from(raw).is_err());
    }
}
