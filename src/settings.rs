//! `KEY=VALUE` settings files (`.env` style).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::SqlFileError;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = ".env";

/// Key/value pairs read from a settings file.
///
/// Loading never touches the process environment; call
/// [`SettingsFile::apply_to_env`] for tools that expect the variables there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFile {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl SettingsFile {
    /// Parse the settings file at `path`.
    ///
    /// Blank lines and `#` comment lines are skipped. A key repeated later in
    /// the file overrides the earlier value. There are no quoting or escaping
    /// rules, so `DB_DRIVER=ODBC Driver 18 for SQL Server` works as written.
    ///
    /// # Errors
    /// Returns `SqlFileError::SettingsFileNotFound` when `path` is not a file,
    /// or `SqlFileError::SettingsError` for a line that does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SqlFileError> {
        let path = path.as_ref();
        if !path.is_file() {
            error!("Environment file not found at: {}", path.display());
            return Err(SqlFileError::SettingsFileNotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let entries = parse_settings(&contents)?;

        info!(
            "Loaded {} setting(s) from: {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Load `.env` from the working directory if it exists.
    ///
    /// # Errors
    /// Returns an error only when the file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Option<Self>, SqlFileError> {
        Self::load_default_in(Path::new("."))
    }

    /// Load `.env` from `dir` if it exists.
    ///
    /// # Errors
    /// Returns an error only when the file exists but cannot be read or parsed.
    pub fn load_default_in(dir: &Path) -> Result<Option<Self>, SqlFileError> {
        let path = dir.join(DEFAULT_SETTINGS_FILE);
        if path.is_file() {
            Self::load(path).map(Some)
        } else {
            debug!("No settings file at {}, skipping", path.display());
            Ok(None)
        }
    }

    /// Load `path` if given, otherwise fall back to [`SettingsFile::load_default`].
    ///
    /// # Errors
    /// A missing explicit path is an error; a missing default file is not.
    pub fn load_optional(path: Option<&Path>) -> Result<Option<Self>, SqlFileError> {
        match path {
            Some(path) => Self::load(path).map(Some),
            None => Self::load_default(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose key is not already set in the process environment.
    pub fn unset_in_env(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(key, _)| std::env::var_os(key).is_none())
    }

    /// Export the entries to a child process, keeping variables the parent
    /// environment already defines.
    pub fn apply_to_command(&self, command: &mut std::process::Command) {
        for (key, value) in self.unset_in_env() {
            command.env(key, value);
        }
    }

    /// Export the entries as process environment variables.
    ///
    /// Variables already present in the environment keep their value.
    ///
    /// # Safety
    /// Must be called while no other thread reads or writes the environment,
    /// typically at the top of `main` before a runtime is started.
    #[allow(unsafe_code)]
    pub unsafe fn apply_to_env(&self) {
        let pending: Vec<(String, String)> = self
            .unset_in_env()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (key, value) in &pending {
            // SAFETY: upheld by the caller.
            unsafe { std::env::set_var(key, value) };
        }
        info!(
            "Exported {} environment variable(s) from: {}",
            pending.len(),
            self.path.display()
        );
    }
}

/// `KEY=VALUE` per line. Keys and values are trimmed; nothing else is
/// interpreted, so quotes and backslashes are kept as written.
fn parse_settings(contents: &str) -> Result<BTreeMap<String, String>, SqlFileError> {
    let mut entries = BTreeMap::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(SqlFileError::SettingsError(format!(
                "line {}: expected KEY=VALUE",
                number + 1
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(SqlFileError::SettingsError(format!(
                "line {}: empty key",
                number + 1
            )));
        }
        entries.insert(key.to_string(), value.trim().to_string());
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_settings(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_pairs_and_skips_comments() {
        let file = write_settings("# connection\n\nDB_SERVER=localhost\nDB_USER=sa\n");
        let settings = SettingsFile::load(file.path()).unwrap();
        assert_eq!(settings.len(), 2);
        assert_eq!(settings.get("DB_SERVER"), Some("localhost"));
        assert_eq!(settings.get("DB_USER"), Some("sa"));
        assert_eq!(settings.get("DB_PASSWORD"), None);
    }

    #[test]
    fn value_may_contain_equals() {
        let file = write_settings("DB_PASSWORD=a=b=c\n");
        let settings = SettingsFile::load(file.path()).unwrap();
        assert_eq!(settings.get("DB_PASSWORD"), Some("a=b=c"));
    }

    #[test]
    fn values_are_taken_verbatim() {
        let file = write_settings("DB_DRIVER = ODBC Driver 18 for SQL Server \nDB_PASSWORD='p#w'\n");
        let settings = SettingsFile::load(file.path()).unwrap();
        assert_eq!(settings.get("DB_DRIVER"), Some("ODBC Driver 18 for SQL Server"));
        assert_eq!(settings.get("DB_PASSWORD"), Some("'p#w'"));
    }

    #[test]
    fn line_without_separator_is_rejected() {
        let file = write_settings("DB_SERVER=localhost\nnonsense\n");
        let err = SettingsFile::load(file.path()).unwrap_err();
        assert!(matches!(err, SqlFileError::SettingsError(ref m) if m.starts_with("line 2")));
    }

    #[test]
    fn missing_explicit_path_is_not_found() {
        let err = SettingsFile::load("/definitely/not/here/.env").unwrap_err();
        assert!(matches!(err, SqlFileError::SettingsFileNotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_default_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SettingsFile::load_default_in(dir.path()).unwrap().is_none());
    }

    #[test]
    fn default_file_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "DB_DATABASE=sales\n").unwrap();
        let settings = SettingsFile::load_default_in(dir.path()).unwrap().unwrap();
        assert_eq!(settings.get("DB_DATABASE"), Some("sales"));
    }
}
