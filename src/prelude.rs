//! Convenient imports for common functionality.

pub use crate::config::{ConnectionConfig, ServerAddress};
pub use crate::database::{Database, DatabaseBuilder};
pub use crate::error::SqlFileError;
pub use crate::results::{DbRow, ResultSet, Table};
pub use crate::settings::SettingsFile;
pub use crate::source::{ConnectionSource, QueryConnection};
pub use crate::template::{SqlTemplate, SubstitutionMode};
pub use crate::types::{RowValues, SqlParams};

#[cfg(feature = "mssql")]
pub use crate::mssql::{MssqlClient, MssqlConnector, MssqlOptions, MssqlPool};
