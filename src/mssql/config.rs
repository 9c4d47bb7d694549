use tiberius::{AuthMethod, Config as TiberiusConfig, EncryptionLevel};

use crate::config::{ConnectionConfig, ServerAddress};
use crate::error::SqlFileError;

/// Options for connecting to SQL Server, derived from a [`ConnectionConfig`].
#[derive(Clone)]
pub struct MssqlOptions {
    pub driver: String,
    pub address: ServerAddress,
    pub database: String,
    pub user: String,
    pub password: String,
    pub trust_cert: bool,
    pub encrypt: bool,
    pub application_name: Option<String>,
}

impl std::fmt::Debug for MssqlOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlOptions")
            .field("driver", &self.driver)
            .field("address", &self.address)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("trust_cert", &self.trust_cert)
            .field("encrypt", &self.encrypt)
            .finish_non_exhaustive()
    }
}

impl MssqlOptions {
    /// # Errors
    /// Returns `SqlFileError::ConfigError` if `DB_SERVER` does not parse.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, SqlFileError> {
        Ok(Self {
            driver: config.driver.clone(),
            address: config.server_address()?,
            database: config.database.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            trust_cert: true,
            encrypt: true,
            application_name: None,
        })
    }

    #[must_use]
    pub fn with_trust_cert(mut self, trust_cert: bool) -> Self {
        self.trust_cert = trust_cert;
        self
    }

    #[must_use]
    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    #[must_use]
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }
}

/// Whether `driver` names something that speaks TDS to SQL Server.
///
/// Accepts the usual ODBC names ("ODBC Driver 18 for SQL Server",
/// "SQL Server Native Client 11.0", "SQL Server", "FreeTDS") as well as
/// "tds" and "tiberius".
#[must_use]
pub fn is_supported_driver(driver: &str) -> bool {
    let driver = driver.trim().trim_start_matches('{').trim_end_matches('}');
    let lower = driver.to_ascii_lowercase();
    lower.contains("sql server")
        || lower.contains("freetds")
        || matches!(lower.as_str(), "tds" | "tiberius" | "mssql")
}

/// Fail with a connection error when the configured driver cannot be served.
///
/// # Errors
/// Returns `SqlFileError::ConnectionError` for a non-SQL Server driver.
pub fn check_driver(driver: &str) -> Result<(), SqlFileError> {
    if is_supported_driver(driver) {
        Ok(())
    } else {
        Err(SqlFileError::ConnectionError(format!(
            "Driver not found: '{driver}' is not a SQL Server driver"
        )))
    }
}

pub(crate) fn build_tiberius_config(opts: &MssqlOptions) -> TiberiusConfig {
    let mut config = TiberiusConfig::new();
    config.host(&opts.address.host);
    config.database(&opts.database);
    config.authentication(AuthMethod::sql_server(&opts.user, &opts.password));
    match (&opts.address.instance, opts.address.port) {
        (Some(instance), port) => {
            config.instance_name(instance);
            if let Some(port) = port {
                config.port(port);
            }
        }
        (None, _) => config.port(opts.address.port_or_default()),
    }
    if let Some(name) = &opts.application_name {
        config.application_name(name);
    }
    config.encryption(if opts.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });
    if opts.trust_cert {
        config.trust_cert();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_sql_server_drivers() {
        assert!(is_supported_driver("ODBC Driver 18 for SQL Server"));
        assert!(is_supported_driver("{ODBC Driver 17 for SQL Server}"));
        assert!(is_supported_driver("SQL Server Native Client 11.0"));
        assert!(is_supported_driver("FreeTDS"));
        assert!(!is_supported_driver("PostgreSQL Unicode"));
        assert!(matches!(
            check_driver("MySQL ODBC 8.0"),
            Err(SqlFileError::ConnectionError(_))
        ));
    }

    #[test]
    fn options_follow_server_address() {
        let config = ConnectionConfig {
            driver: "ODBC Driver 18 for SQL Server".into(),
            server: r"sql01\REPORTING".into(),
            database: "sales".into(),
            user: "reporter".into(),
            password: "secret".into(),
        };
        let opts = MssqlOptions::from_config(&config).unwrap();
        assert_eq!(opts.address.instance.as_deref(), Some("REPORTING"));
        assert!(opts.trust_cert);
        assert!(!format!("{opts:?}").contains("secret"));

        let tib = build_tiberius_config(&opts);
        assert_eq!(tib.get_addr(), "sql01:1434");
    }
}
