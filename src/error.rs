use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlFileError {
    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Missing configuration: {}", .0.join(", "))]
    MissingConfiguration(Vec<&'static str>),

    #[error("Settings file not found: {}", .0.display())]
    SettingsFileNotFound(PathBuf),

    #[error("Settings file error: {0}")]
    SettingsError(String),

    #[error("SQL file not found: {}", .0.display())]
    SqlFileNotFound(PathBuf),

    #[error("Missing parameter for placeholder {{{0}}}")]
    MissingParameter(String),

    #[error("SQL template error: {0}")]
    TemplateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqlFileError {
    /// True for the two "path does not resolve to a file" kinds.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SettingsFileNotFound(_) | Self::SqlFileNotFound(_)
        )
    }
}
