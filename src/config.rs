//! Configuration loaded from `config.toml`.
//!
//! ```toml
//! [execution]
//! on_error = "continue"
//! echo = true
//!
//! [output]
//! format = "json"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::OnError;
use crate::error::{ConvertError, ConvertResult};

/// Summary output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub execution: ExecutionConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub on_error: OnError,
    /// Print each statement before it runs.
    pub echo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> ConvertResult<Self> {
        toml::from_str(content).map_err(|e| ConvertError::Config(e.to_string()))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// used when present, and defaults otherwise.
    pub fn load(path: Option<&Path>) -> ConvertResult<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    ConvertError::Config(format!("Failed to read '{}': {}", path.display(), e))
                })?;
                Self::from_toml(&content)
            }
            None => match default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(Some(&path)),
                None => Ok(Self::default()),
            },
        }
    }
}

/// `$CONFIG_DIR/mysql2sqlite/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mysql2sqlite").join("config.toml"))
}
