//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::codec::ValueKind;
use crate::config::schema::ManagerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Errors raised while loading or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// The bundled default settings could not be read, so no key set is known.
    #[error("Default settings template missing at {0}")]
    MissingTemplate(PathBuf),

    #[error("Malformed settings file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Invalid variable type '{0}'")]
    UnknownKind(String),

    #[error("Invalid {kind} value for {key}: {reason}")]
    InvalidValue {
        key: String,
        kind: ValueKind,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ManagerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    parse_config(&content)
}

/// Load configuration, falling back to defaults when the file does not exist.
pub fn load_or_default(path: &Path) -> Result<ManagerConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No manager config file, using defaults");
        let config = ManagerConfig::default();
        validate_config(&config).map_err(ConfigError::Validation)?;
        return Ok(config);
    }
    load_config(path)
}

pub fn parse_config(content: &str) -> Result<ManagerConfig, ConfigError> {
    let config: ManagerConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
