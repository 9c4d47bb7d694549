//! Synchronous facade over [`crate::Database`].
//!
//! Each `blocking::Database` owns a current-thread tokio runtime and drives
//! one call at a time on it.

use std::path::Path;

use tokio::runtime::{Builder, Runtime};

use crate::config::ConnectionConfig;
use crate::error::SqlFileError;
use crate::results::{ResultSet, Table};
use crate::source::ConnectionSource;
use crate::types::{RowValues, SqlParams};

#[cfg(feature = "mssql")]
use crate::database::DatabaseBuilder;
#[cfg(feature = "mssql")]
use crate::mssql::{MssqlConnector, MssqlPool};

pub struct Database<S> {
    inner: crate::Database<S>,
    runtime: Runtime,
}

impl<S: std::fmt::Debug> std::fmt::Debug for Database<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "mssql")]
impl Database<MssqlConnector> {
    /// Blocking counterpart of [`crate::Database::from_env`].
    ///
    /// # Errors
    /// Configuration errors, or `Io` if the runtime cannot start.
    pub fn from_env(settings_path: Option<&Path>) -> Result<Self, SqlFileError> {
        Self::new(crate::Database::from_env(settings_path)?)
    }
}

#[cfg(feature = "mssql")]
impl Database<MssqlPool> {
    /// # Errors
    /// Configuration errors, a pool that cannot be built, or `Io` if the
    /// runtime cannot start.
    pub fn pooled(builder: DatabaseBuilder, max_size: usize) -> Result<Self, SqlFileError> {
        Self::new(builder.build_pooled(max_size)?)
    }
}

impl<S: ConnectionSource> Database<S> {
    /// Wrap an async facade.
    ///
    /// # Errors
    /// Returns `SqlFileError::Io` if the runtime cannot be created.
    pub fn new(inner: crate::Database<S>) -> Result<Self, SqlFileError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        self.inner.config()
    }

    #[must_use]
    pub fn inner(&self) -> &crate::Database<S> {
        &self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> crate::Database<S> {
        self.inner
    }

    /// # Errors
    /// See [`crate::Database::execute_sql_file`].
    pub fn execute_sql_file(
        &self,
        directory: impl AsRef<Path>,
        filename: impl AsRef<Path>,
        params: &SqlParams,
    ) -> Result<ResultSet, SqlFileError> {
        self.runtime
            .block_on(self.inner.execute_sql_file(directory, filename, params))
    }

    /// # Errors
    /// See [`crate::Database::load_data_from_query`].
    pub fn load_data_from_query(&self, sql: &str) -> Result<Table, SqlFileError> {
        self.runtime.block_on(self.inner.load_data_from_query(sql))
    }

    /// # Errors
    /// See [`crate::Database::load_data_from_sql_file`].
    pub fn load_data_from_sql_file(
        &self,
        directory: impl AsRef<Path>,
        filename: impl AsRef<Path>,
        params: &SqlParams,
    ) -> Result<Table, SqlFileError> {
        self.runtime
            .block_on(self.inner.load_data_from_sql_file(directory, filename, params))
    }

    /// # Errors
    /// See [`crate::Database::execute_query`].
    pub fn execute_query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFileError> {
        self.runtime.block_on(self.inner.execute_query(sql, params))
    }
}
