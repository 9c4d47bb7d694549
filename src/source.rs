//! Where the facade gets its connections from.

use async_trait::async_trait;

use crate::error::SqlFileError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// An open connection that can run one statement or batch at a time.
#[async_trait]
pub trait QueryConnection: Send {
    /// Execute `sql` with positional parameters (`@P1`, `@P2`, ...) and fetch
    /// every row of the first result set.
    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFileError>;
}

/// Hands out connections and takes them back after each call.
///
/// The facade calls [`ConnectionSource::release`] exactly once for every
/// connection it acquired, whether the query succeeded or not.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    type Connection: QueryConnection;

    /// Open (or check out) a connection.
    async fn acquire(&self) -> Result<Self::Connection, SqlFileError>;

    /// Close (or return) a connection. Failures are the source's to log.
    async fn release(&self, conn: Self::Connection);
}
