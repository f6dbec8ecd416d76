//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error:\n{0}")]
    Validation(String),
}

/// Validation problems collected across sections
#[derive(Debug, Default)]
pub struct ConfigDiagnostics {
    errors: Vec<(String, String)>,
}

impl ConfigDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push((field.to_string(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok` if nothing was reported, otherwise one error listing every problem.
    pub fn into_result(self) -> Result<(), ConfigError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let lines: Vec<_> = self
            .errors
            .iter()
            .map(|(field, message)| format!("[{field}] {message}"))
            .collect();
        Err(ConfigError::Validation(lines.join("\n")))
    }
}
