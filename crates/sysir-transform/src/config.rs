use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_ENTRY_NAME: &str = "apply";
pub const DEFAULT_ENTRY_ATTRIBUTE: &str = "sysio_wasm_entry";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown pass: {0}")]
    UnknownPass(String),

    #[error("Pass {0} is already registered")]
    DuplicatePass(String),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Pass names in the order they run.
    pub passes: Vec<String>,
    pub entry: EntryConfig,
    pub collect_statistics: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            passes: vec!["softfloat_fixup".to_string(), "apply_fixup".to_string()],
            entry: EntryConfig::default(),
            collect_statistics: false,
        }
    }
}

impl TransformConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn with_passes<I, S>(passes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passes: passes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// How the contract entry point is recognised: by exact name or by the
/// marker attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    pub name: String,
    pub attribute: String,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENTRY_NAME.to_string(),
            attribute: DEFAULT_ENTRY_ATTRIBUTE.to_string(),
        }
    }
}
