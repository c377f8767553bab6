//! Pipeline configuration
//!
//! All knobs of the import and synthesis paths in one serde document. Every
//! section and field is optional in the JSON; missing values take the
//! defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adaptive::AdaptiveConfig;
use crate::terrain::NoiseConfig;
use crate::vector_map::ImportConfig;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub import: ImportConfig,
    pub terrain: NoiseConfig,
    pub adaptive: AdaptiveConfig,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = PipelineConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse pipeline config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read pipeline config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.terrain.octaves, 9);
        assert_eq!(config.adaptive.max_cells, 200_000);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "terrain": { "sea_level": 0.3 }, "adaptive": { "majority_threshold": 0.9 } }"#,
        )
        .unwrap();
        assert_eq!(config.terrain.sea_level, 0.3);
        assert_eq!(config.terrain.lacunarity, 2.07);
        assert_eq!(config.adaptive.majority_threshold, 0.9);
        assert_eq!(config.import.target_width, 2000);
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut config = PipelineConfig::default();
        config.import.keep_source_names = false;
        config.terrain.blur_passes = 5;
        let json = config.to_json_pretty().unwrap();
        assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_from_file_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.json");
        assert!(matches!(PipelineConfig::from_file(&missing), Err(ConfigError::Read { .. })));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        bad.write_all(b"{ not json").unwrap();
        assert!(matches!(PipelineConfig::from_file(bad.path()), Err(ConfigError::Parse(_))));

        let mut good = tempfile::NamedTempFile::new().unwrap();
        good.write_all(br#"{ "import": { "target_width": 300 } }"#).unwrap();
        let config = PipelineConfig::from_file(good.path()).unwrap();
        assert_eq!(config.import.target_width, 300);
    }
}
