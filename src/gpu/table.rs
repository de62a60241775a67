// Compatibility table loading
//
// The table is a JSON document `{"gpuList": [...]}` of GpuRecords, kept in
// file order. A copy ships inside the binary; an external file configured
// by the user replaces it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CompatError, Result};
use crate::gpu::GpuRecord;

/// Table bundled with the binary
pub const EMBEDDED_TABLE: &str = include_str!("../../data/gpu_list.json");

/// Name reported as the source of the embedded table
const EMBEDDED_SOURCE: &str = "<embedded gpu_list.json>";

#[derive(Debug, Deserialize)]
struct TableDocument {
    #[serde(rename = "gpuList")]
    gpu_list: Vec<GpuRecord>,
}

/// Ordered list of GPU records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityTable {
    records: Vec<GpuRecord>,
    source: PathBuf,
}

impl CompatibilityTable {
    /// Builds a table from records already in memory
    pub fn new(records: Vec<GpuRecord>) -> Self {
        Self {
            records,
            source: PathBuf::from("<memory>"),
        }
    }

    /// Parses a table document; `source` only names it in errors
    pub fn parse(json: &str, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let document: TableDocument = serde_json::from_str(json)
            .map_err(|e| CompatError::configuration(&source, format!("malformed GPU table: {}", e)))?;

        debug!("Parsed {} GPU records from {}", document.gpu_list.len(), source.display());
        Ok(Self {
            records: document.gpu_list,
            source,
        })
    }

    /// Loads a table file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| CompatError::configuration(path, format!("cannot read GPU table: {}", e)))?;
        Self::parse(&json, path)
    }

    /// The table bundled with the binary
    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_TABLE, EMBEDDED_SOURCE)
    }

    /// The configured table: the external file when set, the embedded one otherwise
    pub fn load(config: &Config) -> Result<Self> {
        let table = match &config.gpu_table {
            Some(path) => Self::from_file(path)?,
            None => Self::embedded()?,
        };
        info!("Loaded {} GPU records from {}", table.len(), table.source.display());
        Ok(table)
    }

    pub fn records(&self) -> &[GpuRecord] {
        &self.records
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::codename::OsVersion;
    use crate::gpu::SupportStatus;
    use tempfile::TempDir;

    #[test]
    fn embedded_table_parses_and_has_the_gtx_650() {
        let table = CompatibilityTable::embedded().unwrap();
        assert!(table.len() > 40);

        let gtx_650 = table
            .records()
            .iter()
            .find(|r| r.match_token == "GTX 650")
            .unwrap();
        assert_eq!(gtx_650.supported, SupportStatus::Supported);
        assert_eq!(gtx_650.min_os, OsVersion::NotApplicable);
        assert_eq!(gtx_650.max_os, OsVersion::from_code(1013));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = CompatibilityTable::from_file(&dir.path().join("gpu_list.json")).unwrap_err();
        assert!(matches!(err, CompatError::Configuration { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gpu_list.json");
        fs::write(&path, r#"{"gpuList": [{"name": "GTX 650"}]}"#).unwrap();

        match CompatibilityTable::from_file(&path).unwrap_err() {
            CompatError::Configuration { path: reported, message } => {
                assert_eq!(reported, path);
                assert!(message.contains("malformed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn configured_file_replaces_the_embedded_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(
            &path,
            r#"{"gpuList": [{"name": "RX 580", "fullName": "AMD Radeon RX 580", "vendor": "AMD",
                "supported": true, "minOS": 1013, "maxOS": 9999, "quirks": "0"}]}"#,
        )
        .unwrap();

        let config = Config {
            gpu_table: Some(path.clone()),
            ..Config::default()
        };
        let table = CompatibilityTable::load(&config).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.source(), path.as_path());
        assert_eq!(table.records()[0].max_os, OsVersion::Latest);
    }
}
