// Configuration file handling

use crate::store::DEFAULT_FILE_NAME;
use crate::task::Priority;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "tasklist";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// User configuration, read from `<config_dir>/tasklist/config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where tasks are persisted. Defaults to `<data_dir>/tasklist/tasks.json`.
    pub data_file: Option<PathBuf>,
    /// Priority used by `add` when none is given
    pub default_priority: Priority,
}

impl Config {
    /// Load config from an explicit path, or from the default location
    ///
    /// An explicit path must exist. A missing default file yields the
    /// default config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                return Err(eyre!("Config file not found: {}", path.display()));
            }
            debug!(file = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(file = ?path, ?config, "Loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse YAML")
    }

    /// The task file to use, with an optional override taking precedence
    pub fn data_file(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = override_path.or(self.data_file.as_deref()) {
            return Ok(path.to_path_buf());
        }
        default_data_file().ok_or_else(|| eyre!("Could not determine a data directory; pass --file"))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
}

pub fn default_data_file() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR).join(DEFAULT_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse("data_file: /tmp/my-tasks.json\ndefault_priority: High\n").unwrap();
        assert_eq!(config.data_file, Some(PathBuf::from("/tmp/my-tasks.json")));
        assert_eq!(config.default_priority, Priority::High);
    }

    #[test]
    fn test_parse_partial_and_empty_config() {
        let config = Config::parse("default_priority: Low\n").unwrap();
        assert_eq!(config.data_file, None);
        assert_eq!(config.default_priority, Priority::Low);

        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_invalid_config() {
        assert!(Config::parse("default_priority: Urgent\n").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "default_priority: High\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.default_priority, Priority::High);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(Some(temp.path().join("missing.yaml").as_path())).is_err());
    }

    #[test]
    fn test_data_file_precedence() {
        let config = Config {
            data_file: Some(PathBuf::from("from-config.json")),
            default_priority: Priority::Medium,
        };

        assert_eq!(
            config.data_file(Some(Path::new("from-flag.json"))).unwrap(),
            PathBuf::from("from-flag.json")
        );
        assert_eq!(config.data_file(None).unwrap(), PathBuf::from("from-config.json"));
    }
}
