use tiberius::{Client, Config as TiberiusConfig, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use super::config::{MssqlOptions, build_tiberius_config, check_driver};
use crate::error::SqlFileError;

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Open a new SQL Server connection.
///
/// Named instances without an explicit port are resolved through the SQL
/// Browser service. A routing response (Azure SQL gateways) is followed once.
///
/// # Errors
/// Returns `SqlFileError::ConnectionError` if the driver is not a SQL Server
/// driver, the server cannot be reached, or login fails.
pub async fn create_mssql_client(opts: &MssqlOptions) -> Result<MssqlClient, SqlFileError> {
    check_driver(&opts.driver)?;

    let config = build_tiberius_config(opts);
    let tcp = open_stream(opts, &config).await?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => {
            debug!(host = %opts.address.host, database = %opts.database, "Connected to SQL Server");
            Ok(client)
        }
        Err(tiberius::error::Error::Routing { host, port }) => {
            info!("SQL Server redirected connection to {host}:{port}");
            let mut config = config;
            config.host(&host);
            config.port(port);
            let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
                SqlFileError::ConnectionError(format!("TCP connection error: {e}"))
            })?;
            Client::connect(config, tcp.compat_write()).await.map_err(|e| {
                SqlFileError::ConnectionError(format!("SQL Server connection error: {e}"))
            })
        }
        Err(e) => Err(SqlFileError::ConnectionError(format!(
            "SQL Server connection error: {e}"
        ))),
    }
}

async fn open_stream(
    opts: &MssqlOptions,
    config: &TiberiusConfig,
) -> Result<TcpStream, SqlFileError> {
    let tcp = if opts.address.instance.is_some() && opts.address.port.is_none() {
        TcpStream::connect_named(config).await.map_err(|e| {
            SqlFileError::ConnectionError(format!("SQL Browser lookup failed: {e}"))
        })?
    } else {
        TcpStream::connect(config.get_addr()).await.map_err(|e| {
            SqlFileError::ConnectionError(format!("TCP connection error: {e}"))
        })?
    };
    tcp.set_nodelay(true).ok();
    Ok(tcp)
}
