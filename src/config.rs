use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use crate::error::{IngestError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_ENV_VAR: &str = "WORM_INGEST_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub inputs: InputPaths,
    pub output: OutputConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("data/worm.db"),
        }
    }
}

/// Dataset locations. A missing entry skips the stage that reads it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    /// Relational dump (neurons, muscle innervation)
    pub celegans_db: Option<PathBuf>,
    /// Connectivity spreadsheet exported as CSV
    pub connectome_sheet: Option<PathBuf>,
    /// Edgelist CSV; takes precedence over the connectivity sheet
    pub edgelist: Option<PathBuf>,
    /// Receptor/neurotransmitter/type annotations CSV
    pub annotations: Option<PathBuf>,
    /// Cell list with lineage names and descriptions (TSV)
    pub lineage: Option<PathBuf>,
    pub altun_bib: Option<PathBuf>,
    pub wormatlas_bib: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// N-Triples dump of the full fact set
    pub ntriples: Option<PathBuf>,
    /// JSON run report
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub enabled: bool,
    pub rules: PathBuf,
    pub max_rounds: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: PathBuf::from("config/inference_rules.toml"),
            max_rounds: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "worm_ingest.log".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.inference.max_rounds == 0 {
            return Err(IngestError::Config(
                "inference.max_rounds must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// `--config` wins, then the environment variable, then `config.toml`
    pub fn resolve_path(cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert!(config.inputs.edgelist.is_none());
        assert!(config.inference.enabled);
        assert_eq!(config.inference.max_rounds, 16);
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config = Config::from_toml_str(
            r#"
            [store]
            backend = "memory"

            [inputs]
            edgelist = "aux_data/herm_full_edgelist.csv"

            [inference]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.path, PathBuf::from("data/worm.db"));
        assert_eq!(
            config.inputs.edgelist.as_deref(),
            Some(Path::new("aux_data/herm_full_edgelist.csv"))
        );
        assert!(!config.inference.enabled);
        assert_eq!(
            config.inference.rules,
            PathBuf::from("config/inference_rules.toml")
        );
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = Config::from_toml_str("[store]\nbackend = \"zodb\"").unwrap_err();
        assert!(matches!(err, IngestError::Toml(_)));
    }

    #[test]
    fn test_zero_rounds_is_a_config_error() {
        let err = Config::from_toml_str("[inference]\nmax_rounds = 0").unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err = Config::load(Path::new("/nonexistent/worm.toml")).unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }
}
