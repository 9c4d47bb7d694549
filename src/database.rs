//! The connection/query facade.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;
use crate::error::SqlFileError;
use crate::results::{ResultSet, Table};
use crate::settings::SettingsFile;
use crate::source::{ConnectionSource, QueryConnection};
use crate::template::{SqlTemplate, SubstitutionMode};
use crate::types::{RowValues, SqlParams};

#[cfg(feature = "mssql")]
use crate::mssql::{MssqlConnector, MssqlOptions, MssqlPool};

/// One logical database target.
///
/// Holds the resolved configuration and a [`ConnectionSource`]. Every call
/// acquires a connection, runs one statement or batch, and releases the
/// connection before returning, on success and on failure alike.
///
/// ```rust,no_run
/// use mssql_sqlfile::prelude::*;
///
/// # async fn demo() -> Result<(), SqlFileError> {
/// let db = Database::from_env(None)?;
/// let params = SqlParams::new().with("region", "EMEA");
/// let rows = db.execute_sql_file("sql", "sales_by_region.sql", &params).await?;
/// let table = db.load_data_from_query("SELECT 1 AS x").await?;
/// # let _ = (rows, table);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Database<S> {
    config: ConnectionConfig,
    source: S,
    substitution: SubstitutionMode,
}

#[cfg(feature = "mssql")]
impl Database<MssqlConnector> {
    /// Resolve configuration from the environment and an optional settings
    /// file (default `.env` in the working directory), connecting per call.
    ///
    /// # Errors
    /// Returns `SqlFileError::SettingsFileNotFound` for a missing explicit
    /// path and `SqlFileError::MissingConfiguration` when a `DB_*` value is
    /// absent.
    pub fn from_env(settings_path: Option<&Path>) -> Result<Self, SqlFileError> {
        let mut builder = DatabaseBuilder::new();
        if let Some(path) = settings_path {
            builder = builder.settings_file(path);
        }
        builder.build()
    }
}

impl Database<()> {
    #[must_use]
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }
}

impl<S: ConnectionSource> Database<S> {
    /// Use an explicit connection source, e.g. a pool or a test double.
    #[must_use]
    pub fn with_source(config: ConnectionConfig, source: S) -> Self {
        Self {
            config,
            source,
            substitution: SubstitutionMode::default(),
        }
    }

    #[must_use]
    pub fn with_substitution(mut self, substitution: SubstitutionMode) -> Self {
        if substitution == SubstitutionMode::Literal {
            warn!("Literal parameter substitution enabled; parameter values are not escaped");
        }
        self.substitution = substitution;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn substitution(&self) -> SubstitutionMode {
        self.substitution
    }

    /// Load `directory/filename`, substitute `params`, execute, and return
    /// every row of the first result set.
    ///
    /// The file and the parameters are checked before a connection is opened.
    ///
    /// # Errors
    /// - `SqlFileError::SqlFileNotFound` if the file does not exist
    /// - `SqlFileError::MissingParameter` if a placeholder has no value
    /// - `SqlFileError::ConnectionError` / `ExecutionError` from the server
    pub async fn execute_sql_file(
        &self,
        directory: impl AsRef<Path>,
        filename: impl AsRef<Path>,
        params: &SqlParams,
    ) -> Result<ResultSet, SqlFileError> {
        let template = read_sql_file(directory.as_ref(), filename.as_ref()).await?;
        let bound = template.prepare(params, self.substitution).inspect_err(|e| {
            error!("Error preparing SQL file {}: {e}", filename.as_ref().display());
        })?;
        self.run(&bound.sql, &bound.params).await
    }

    /// Execute `sql` as written (no file, no substitution) and return the
    /// rows as a [`Table`].
    ///
    /// # Errors
    /// `SqlFileError::ConnectionError` / `ExecutionError` from the server.
    pub async fn load_data_from_query(&self, sql: &str) -> Result<Table, SqlFileError> {
        self.run(sql, &[]).await.map(Table::from)
    }

    /// [`Database::execute_sql_file`], returned as a [`Table`].
    ///
    /// # Errors
    /// Same as [`Database::execute_sql_file`].
    pub async fn load_data_from_sql_file(
        &self,
        directory: impl AsRef<Path>,
        filename: impl AsRef<Path>,
        params: &SqlParams,
    ) -> Result<Table, SqlFileError> {
        self.execute_sql_file(directory, filename, params)
            .await
            .map(Table::from)
    }

    /// Execute `sql` with positional `@P1..@Pn` parameters.
    ///
    /// # Errors
    /// `SqlFileError::ConnectionError` / `ExecutionError` from the server.
    pub async fn execute_query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlFileError> {
        self.run(sql, params).await
    }

    async fn run(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFileError> {
        let mut conn = self.source.acquire().await.inspect_err(|e| {
            error!("Error connecting to database: {e}");
        })?;

        debug!(params = params.len(), "Executing query");
        let result = conn.query(sql, params).await;
        self.source.release(conn).await;

        match &result {
            Ok(rs) => debug!(rows = rs.len(), "Query complete"),
            Err(e) => error!("Error executing query: {e}"),
        }
        result
    }
}

/// Read `directory/filename` as a SQL template.
///
/// # Errors
/// `SqlFileError::SqlFileNotFound` if the path is not a file, `Io` for other
/// read failures (including invalid UTF-8).
pub async fn read_sql_file(directory: &Path, filename: &Path) -> Result<SqlTemplate, SqlFileError> {
    let file_path = directory.join(filename);
    if !file_path.is_file() {
        error!("SQL file not found: {}", file_path.display());
        return Err(SqlFileError::SqlFileNotFound(file_path));
    }
    match tokio::fs::read_to_string(&file_path).await {
        Ok(text) => Ok(SqlTemplate::new(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!("SQL file not found: {}", file_path.display());
            Err(SqlFileError::SqlFileNotFound(file_path))
        }
        Err(e) => {
            error!("Error reading SQL file: {e}");
            Err(e.into())
        }
    }
}

/// Fluent builder for a [`Database`].
#[derive(Debug, Clone, Default)]
#[cfg_attr(not(feature = "mssql"), allow(dead_code))]
pub struct DatabaseBuilder {
    settings_path: Option<PathBuf>,
    skip_default_settings: bool,
    substitution: SubstitutionMode,
    trust_cert: Option<bool>,
    encrypt: Option<bool>,
    application_name: Option<String>,
}

impl DatabaseBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from this file; a missing file is an error.
    #[must_use]
    pub fn settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Do not look for `.env` in the working directory.
    #[must_use]
    pub fn skip_default_settings(mut self) -> Self {
        self.skip_default_settings = true;
        self
    }

    #[must_use]
    pub fn substitution(mut self, substitution: SubstitutionMode) -> Self {
        self.substitution = substitution;
        self
    }

    #[must_use]
    pub fn trust_cert(mut self, trust_cert: bool) -> Self {
        self.trust_cert = Some(trust_cert);
        self
    }

    #[must_use]
    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = Some(encrypt);
        self
    }

    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Load settings and resolve the five `DB_*` values.
    ///
    /// # Errors
    /// `SettingsFileNotFound`, `SettingsError` or `MissingConfiguration`.
    pub fn resolve_config(&self) -> Result<ConnectionConfig, SqlFileError> {
        let settings = match &self.settings_path {
            Some(path) => Some(SettingsFile::load(path)?),
            None if self.skip_default_settings => None,
            None => SettingsFile::load_default()?,
        };
        let config = ConnectionConfig::resolve(settings.as_ref())?;
        info!(
            server = %config.server,
            database = %config.database,
            "Database configuration resolved"
        );
        Ok(config)
    }

    /// Finish with a caller-supplied connection source.
    ///
    /// # Errors
    /// Same as [`DatabaseBuilder::resolve_config`].
    pub fn build_with_source<S, F>(self, make_source: F) -> Result<Database<S>, SqlFileError>
    where
        S: ConnectionSource,
        F: FnOnce(&ConnectionConfig) -> Result<S, SqlFileError>,
    {
        let config = self.resolve_config()?;
        let source = make_source(&config)?;
        Ok(Database::with_source(config, source).with_substitution(self.substitution))
    }

    #[cfg(feature = "mssql")]
    fn mssql_options(&self, config: &ConnectionConfig) -> Result<MssqlOptions, SqlFileError> {
        let mut opts = MssqlOptions::from_config(config)?;
        if let Some(trust_cert) = self.trust_cert {
            opts = opts.with_trust_cert(trust_cert);
        }
        if let Some(encrypt) = self.encrypt {
            opts = opts.with_encryption(encrypt);
        }
        if let Some(name) = &self.application_name {
            opts = opts.with_application_name(name.clone());
        }
        Ok(opts)
    }

    /// Connect per call.
    ///
    /// # Errors
    /// Configuration errors; no connection is attempted here.
    #[cfg(feature = "mssql")]
    pub fn build(self) -> Result<Database<MssqlConnector>, SqlFileError> {
        let builder = self.clone();
        self.build_with_source(|config| builder.mssql_options(config).map(MssqlConnector::new))
    }

    /// Draw connections from a pool of at most `max_size`.
    ///
    /// # Errors
    /// Configuration errors or a pool that cannot be built.
    #[cfg(feature = "mssql")]
    pub fn build_pooled(self, max_size: usize) -> Result<Database<MssqlPool>, SqlFileError> {
        let builder = self.clone();
        self.build_with_source(|config| MssqlPool::new(builder.mssql_options(config)?, max_size))
    }
}
