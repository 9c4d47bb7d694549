use std::fmt;

use async_trait::async_trait;
use deadpool::managed::{Manager, Metrics, Object, Pool, RecycleError, RecycleResult};
use tracing::debug;

use super::client::{MssqlClient, create_mssql_client};
use super::config::MssqlOptions;
use super::query::build_result_set;
use crate::config::ConnectionConfig;
use crate::error::SqlFileError;
use crate::results::ResultSet;
use crate::source::{ConnectionSource, QueryConnection};
use crate::types::RowValues;

/// Default upper bound on pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Manager for SQL Server connections (used with Deadpool)
pub struct MssqlManager {
    opts: MssqlOptions,
}

impl fmt::Debug for MssqlManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MssqlManager")
            .field("host", &self.opts.address.host)
            .field("database", &self.opts.database)
            .finish()
    }
}

impl Manager for MssqlManager {
    type Type = MssqlClient;
    type Error = SqlFileError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        create_mssql_client(&self.opts).await
    }

    async fn recycle(&self, client: &mut Self::Type, _metrics: &Metrics) -> RecycleResult<Self::Error> {
        // Connection is still usable if a trivial round-trip succeeds.
        client
            .execute("SELECT 1", &[])
            .await
            .map(|_| ())
            .map_err(|e| RecycleError::Backend(SqlFileError::from(e)))
    }
}

/// A deadpool of SQL Server connections, for callers that run many small
/// queries and should not pay a login per call.
#[derive(Clone)]
pub struct MssqlPool {
    pool: Pool<MssqlManager>,
}

impl fmt::Debug for MssqlPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MssqlPool")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl MssqlPool {
    /// Build a pool; no connection is opened until the first call.
    ///
    /// # Errors
    /// Returns `SqlFileError::ConnectionError` if the pool cannot be built.
    pub fn new(opts: MssqlOptions, max_size: usize) -> Result<Self, SqlFileError> {
        let pool = Pool::builder(MssqlManager { opts })
            .max_size(max_size.max(1))
            .build()
            .map_err(|e| {
                SqlFileError::ConnectionError(format!("Failed to create SQL Server pool: {e}"))
            })?;
        Ok(Self { pool })
    }

    /// # Errors
    /// Returns `SqlFileError::ConfigError` if `DB_SERVER` does not parse.
    pub fn from_config(config: &ConnectionConfig, max_size: usize) -> Result<Self, SqlFileError> {
        Self::new(MssqlOptions::from_config(config)?, max_size)
    }

    #[must_use]
    pub fn status(&self) -> deadpool::Status {
        self.pool.status()
    }
}

/// A connection checked out of an [`MssqlPool`].
pub struct PooledMssqlConnection {
    conn: Object<MssqlManager>,
}

#[async_trait]
impl QueryConnection for PooledMssqlConnection {
    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFileError> {
        let client = &mut *self.conn;
        build_result_set(client, sql, params).await
    }
}

#[async_trait]
impl ConnectionSource for MssqlPool {
    type Connection = PooledMssqlConnection;

    async fn acquire(&self) -> Result<PooledMssqlConnection, SqlFileError> {
        let conn = self.pool.get().await.map_err(|e| {
            SqlFileError::ConnectionError(format!("SQL Server pool error: {e}"))
        })?;
        Ok(PooledMssqlConnection { conn })
    }

    async fn release(&self, conn: PooledMssqlConnection) {
        drop(conn);
        debug!(status = ?self.pool.status(), "Returned SQL Server connection to pool");
    }
}
