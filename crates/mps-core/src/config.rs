//! Ingestion settings, loadable from a JSON file

use crate::error::{Error, Result};
use crate::projector::{
    DuplicatePolicy, ProjectOptions, DEFAULT_OUTER_KEY, DEFAULT_RUN_ID_FIELD,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Identifier the addon assigns its saved table to
pub const DEFAULT_IDENTIFIER: &str = "MythicPlusStatsDB";
/// File name the addon's SavedVariables are written to
pub const DEFAULT_FILE_NAME: &str = "MythicPlusStats.lua";

/// Settings for reading and projecting a SavedVariables file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Text that must appear in the file for it to be accepted
    pub identifier: String,
    /// File name searched for by the scanner
    pub file_name: String,
    /// Root field wrapping the map table, `null` to use the root directly
    pub outer_key: Option<String>,
    /// Field inside each run table holding the run id
    pub run_id_field: String,
    /// Handling of keys repeated within one table
    pub duplicates: DuplicatePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            outer_key: Some(DEFAULT_OUTER_KEY.to_string()),
            run_id_field: DEFAULT_RUN_ID_FIELD.to_string(),
            duplicates: DuplicatePolicy::LastWins,
        }
    }
}

impl IngestConfig {
    /// Load a config file from JSON. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the config to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn project_options(&self) -> ProjectOptions {
        ProjectOptions {
            outer_key: self.outer_key.clone(),
            run_id_field: self.run_id_field.clone(),
            duplicates: self.duplicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_projector_defaults() {
        assert_eq!(IngestConfig::default().project_options(), ProjectOptions::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: IngestConfig = serde_json::from_str(r#"{"duplicates": "reject"}"#).unwrap();
        assert_eq!(config.duplicates, DuplicatePolicy::Reject);
        assert_eq!(config.identifier, DEFAULT_IDENTIFIER);
        assert_eq!(config.project_options(), ProjectOptions::strict());
    }

    #[test]
    fn test_null_outer_key() {
        let config: IngestConfig = serde_json::from_str(r#"{"outer_key": null}"#).unwrap();
        assert_eq!(config.project_options().outer_key, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mps.json");

        let config = IngestConfig {
            run_id_field: "id".to_string(),
            ..IngestConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(IngestConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = IngestConfig::load("/nonexistent/mps.json").unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
