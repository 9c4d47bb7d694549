use async_trait::async_trait;
use tracing::{debug, warn};

use super::client::{MssqlClient, create_mssql_client};
use super::config::MssqlOptions;
use super::query::build_result_set;
use crate::config::ConnectionConfig;
use crate::error::SqlFileError;
use crate::results::ResultSet;
use crate::source::{ConnectionSource, QueryConnection};
use crate::types::RowValues;

/// Opens a fresh SQL Server connection for every call and closes it afterwards.
#[derive(Debug, Clone)]
pub struct MssqlConnector {
    opts: MssqlOptions,
}

impl MssqlConnector {
    #[must_use]
    pub fn new(opts: MssqlOptions) -> Self {
        Self { opts }
    }

    /// # Errors
    /// Returns `SqlFileError::ConfigError` if `DB_SERVER` does not parse.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, SqlFileError> {
        MssqlOptions::from_config(config).map(Self::new)
    }

    #[must_use]
    pub fn options(&self) -> &MssqlOptions {
        &self.opts
    }
}

/// A single dedicated SQL Server connection.
pub struct MssqlConnection {
    client: MssqlClient,
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MssqlConnection")
            .field(&"<MssqlClient>")
            .finish()
    }
}

impl MssqlConnection {
    #[must_use]
    pub fn into_client(self) -> MssqlClient {
        self.client
    }
}

#[async_trait]
impl QueryConnection for MssqlConnection {
    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFileError> {
        build_result_set(&mut self.client, sql, params).await
    }
}

#[async_trait]
impl ConnectionSource for MssqlConnector {
    type Connection = MssqlConnection;

    async fn acquire(&self) -> Result<MssqlConnection, SqlFileError> {
        let client = create_mssql_client(&self.opts).await?;
        Ok(MssqlConnection { client })
    }

    async fn release(&self, conn: MssqlConnection) {
        match conn.client.close().await {
            Ok(()) => debug!("Closed SQL Server connection"),
            Err(e) => warn!("Error closing SQL Server connection: {e}"),
        }
    }
}
