//! Run parameterized SQL files against SQL Server.
//!
//! Connection settings (`DB_DRIVER`, `DB_SERVER`, `DB_DATABASE`, `DB_USER`,
//! `DB_PASSWORD`) come from the process environment or a `KEY=VALUE`
//! settings file. SQL files carry `{name}` placeholders that are bound as
//! driver parameters at execution time.

pub mod blocking;
pub mod config;
pub mod database;
pub mod error;
pub mod prelude;
pub mod results;
pub mod settings;
pub mod source;
pub mod template;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;

pub use config::{ConnectionConfig, ServerAddress};
pub use database::{Database, DatabaseBuilder, read_sql_file};
pub use error::SqlFileError;
pub use results::{DbRow, ResultSet, Table};
pub use settings::SettingsFile;
pub use source::{ConnectionSource, QueryConnection};
pub use template::{BoundQuery, SqlTemplate, SubstitutionMode};
pub use types::{RowValues, SqlParams};

#[cfg(feature = "mssql")]
pub use mssql::{MssqlConnector, MssqlOptions, MssqlPool};
