// SQL Server support via tiberius
//
// - config: connection options derived from the resolved DB_* settings
// - client: raw client creation
// - query: parameter binding and result extraction
// - source: one connection per call
// - pool: deadpool-managed connections

pub mod client;
pub mod config;
pub mod pool;
pub mod query;
pub mod source;

pub use client::{MssqlClient, create_mssql_client};
pub use config::{MssqlOptions, check_driver, is_supported_driver};
pub use pool::{DEFAULT_POOL_SIZE, MssqlManager, MssqlPool, PooledMssqlConnection};
pub use query::{bind_query_params, build_result_set};
pub use source::{MssqlConnection, MssqlConnector};
