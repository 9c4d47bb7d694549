use std::fmt;

use tracing::{debug, error};

use crate::error::SqlFileError;
use crate::settings::SettingsFile;

pub const DB_DRIVER: &str = "DB_DRIVER";
pub const DB_SERVER: &str = "DB_SERVER";
pub const DB_DATABASE: &str = "DB_DATABASE";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";

/// Every variable [`ConnectionConfig::resolve`] requires, in report order.
pub const REQUIRED_VARS: [&str; 5] = [DB_DRIVER, DB_SERVER, DB_DATABASE, DB_USER, DB_PASSWORD];

pub const DEFAULT_PORT: u16 = 1433;

/// Resolved connection settings. All five fields are non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub driver: String,
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectionConfig {
    /// Resolve from the process environment, falling back to `settings`.
    ///
    /// A non-empty environment variable always wins over the file.
    ///
    /// # Errors
    /// Returns `SqlFileError::MissingConfiguration` naming every variable that
    /// is unset or empty in both places.
    pub fn resolve(settings: Option<&SettingsFile>) -> Result<Self, SqlFileError> {
        Self::resolve_with(|key| std::env::var(key).ok(), settings)
    }

    /// Same as [`ConnectionConfig::resolve`] with a caller-supplied
    /// environment lookup.
    ///
    /// # Errors
    /// Returns `SqlFileError::MissingConfiguration` if any variable is missing.
    pub fn resolve_with<F>(lookup: F, settings: Option<&SettingsFile>) -> Result<Self, SqlFileError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let values = REQUIRED_VARS.map(|key| {
            let value = lookup(key)
                .filter(|v| !v.is_empty())
                .or_else(|| {
                    settings
                        .and_then(|s| s.get(key))
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                });
            if value.is_none() {
                missing.push(key);
            }
            value.unwrap_or_default()
        });

        if !missing.is_empty() {
            error!("Missing database configuration: {}", missing.join(", "));
            return Err(SqlFileError::MissingConfiguration(missing));
        }

        let [driver, server, database, user, password] = values;
        let config = Self {
            driver,
            server,
            database,
            user,
            password,
        };
        debug!(?config, "Resolved connection configuration");
        Ok(config)
    }

    /// Parse `server` into host, port and instance name.
    ///
    /// # Errors
    /// Returns `SqlFileError::ConfigError` for an empty host or a bad port.
    pub fn server_address(&self) -> Result<ServerAddress, SqlFileError> {
        ServerAddress::parse(&self.server)
    }

    /// ODBC connection string for tools that take one.
    #[must_use]
    pub fn odbc_connection_string(&self) -> String {
        format!(
            "DRIVER={{{}}};SERVER={};DATABASE={};UID={};PWD={}",
            self.driver, self.server, self.database, self.user, self.password
        )
    }
}

/// Where to reach the server, parsed from an ODBC `SERVER=` value.
///
/// Accepted forms: `host`, `host,port`, `host\instance`, `host\instance,port`,
/// with an optional `tcp:` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: Option<u16>,
    pub instance: Option<String>,
}

impl ServerAddress {
    /// # Errors
    /// Returns `SqlFileError::ConfigError` for an empty host or a port that is
    /// not a `u16`.
    pub fn parse(raw: &str) -> Result<Self, SqlFileError> {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix("tcp:")
            .or_else(|| trimmed.strip_prefix("TCP:"))
            .unwrap_or(trimmed);

        let (rest, port) = match trimmed.rsplit_once(',') {
            Some((rest, port)) => {
                let port = port.trim().parse::<u16>().map_err(|e| {
                    SqlFileError::ConfigError(format!("Invalid port in {DB_SERVER} '{raw}': {e}"))
                })?;
                (rest, Some(port))
            }
            None => (trimmed, None),
        };

        let (host, instance) = match rest.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => {
                (host, Some(instance.to_string()))
            }
            Some((host, _)) => (host, None),
            None => (rest, None),
        };

        let host = match host.trim() {
            "." | "(local)" => "localhost",
            other => other,
        };
        if host.is_empty() {
            return Err(SqlFileError::ConfigError(format!(
                "No host in {DB_SERVER} '{raw}'"
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            instance,
        })
    }

    /// Explicit port, or 1433 when no named instance is involved.
    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}
