// Configuration for Exliar Compat
//
// Every setting the classifier and the readiness scorer depend on lives here
// and is passed explicitly into their entry points.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompatError, Result};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "exliar-compat.json";

/// How detected device strings are matched against table tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// All detected strings are joined into one search blob
    #[default]
    Joined,
    /// Each detected string is searched on its own
    PerDevice,
}

/// The newest macOS release, shown for records whose max OS is "latest"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestOs {
    pub name: String,
    pub version: String,
}

impl Default for LatestOs {
    fn default() -> Self {
        Self {
            name: "Sonoma".to_string(),
            version: "14".to_string(),
        }
    }
}

/// Minimum kernel version the readiness checks accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelThreshold {
    pub major: u32,
    pub minor: u32,
}

impl Default for KernelThreshold {
    fn default() -> Self {
        Self { major: 4, minor: 19 }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gpu_table: Option<PathBuf>, // External table, embedded table when None
    pub latest_os: LatestOs,
    pub match_mode: MatchMode,
    pub strict_ids: bool,           // Also match records by exact vendor:device id
    pub min_kernel: KernelThreshold,
    pub repo_root: PathBuf,         // Where boot scripts and resources live
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gpu_table: None,
            latest_os: LatestOs::default(),
            match_mode: MatchMode::default(),
            strict_ids: false,
            min_kernel: KernelThreshold::default(),
            repo_root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads the config from `path`, falling back to defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CompatError::configuration(path, e.to_string()))?;
        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| CompatError::configuration(path, e.to_string()))?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Saves the config as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serialized)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.latest_os.name, "Sonoma");
        assert_eq!(config.match_mode, MatchMode::Joined);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "match_mode": "per_device", "strict_ids": true }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.match_mode, MatchMode::PerDevice);
        assert!(config.strict_ids);
        assert_eq!(config.min_kernel, KernelThreshold { major: 4, minor: 19 });
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, CompatError::Configuration { .. }));
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            latest_os: LatestOs {
                name: "Sequoia".to_string(),
                version: "15".to_string(),
            },
            ..Config::default()
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
