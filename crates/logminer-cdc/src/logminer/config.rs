//! LogMiner connection configuration
//!
//! A plain, cloneable description of how to reach the database. Workers
//! receive a copy and open their own connection through a
//! [`ConnectionFactory`](super::ConnectionFactory).

use crate::common::{CdcConfig, CdcError, Result};
use serde::Deserialize;

/// Oracle connection configuration
///
/// # Security Note
///
/// This struct implements a custom Debug that redacts the password field
/// to prevent accidental leakage to logs.
///
/// # Example
///
/// ```rust
/// use logminer_cdc::logminer::LogMinerConfig;
///
/// let config = LogMinerConfig::builder()
///     .host("oracle.internal")
///     .service_name("ORCLPDB1")
///     .username("c##miner")
///     .password("secret")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.connect_descriptor(), "//oracle.internal:1521/ORCLPDB1");
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LogMinerConfig {
    /// Database host
    pub host: String,
    /// Listener port (default: 1521)
    pub port: u16,
    /// Service name of the database (or PDB) to mine
    pub service_name: String,
    /// Username with LOGMINING / EXECUTE_CATALOG_ROLE privileges
    pub username: String,
    /// Password for authentication
    pub password: Option<String>,
    /// Application name reported to the database session
    pub application_name: String,
    /// Connection timeout in seconds, enforced by the connection factory (default: 30)
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for LogMinerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogMinerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("service_name", &self.service_name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("application_name", &self.application_name)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for LogMinerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1521,
            service_name: String::new(),
            username: String::new(),
            password: None,
            application_name: "logminer-cdc".to_string(),
            connect_timeout_secs: 30,
        }
    }
}

impl LogMinerConfig {
    /// Create a new builder for LogMinerConfig
    pub fn builder() -> LogMinerConfigBuilder {
        LogMinerConfigBuilder::default()
    }

    /// Easy Connect descriptor (`//host:port/service`), without credentials
    pub fn connect_descriptor(&self) -> String {
        format!("//{}:{}/{}", self.host, self.port, self.service_name)
    }
}

impl CdcConfig for LogMinerConfig {
    fn source_type(&self) -> &'static str {
        "oracle"
    }

    fn connection_string(&self) -> String {
        format!("{}@{}", self.username, self.connect_descriptor())
    }

    fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(CdcError::config("Host is required"));
        }
        if self.port == 0 {
            return Err(CdcError::config("Port must be > 0"));
        }
        if self.service_name.is_empty() {
            return Err(CdcError::config("Service name is required"));
        }
        if self.username.is_empty() {
            return Err(CdcError::config("Username is required"));
        }
        Ok(())
    }
}

/// Builder for LogMinerConfig
#[derive(Default)]
pub struct LogMinerConfigBuilder {
    config: LogMinerConfig,
}

impl LogMinerConfigBuilder {
    /// Set the database host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the listener port (default: 1521)
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the service name
    pub fn service_name(mut self, service_name: impl Into<String>) -> Self {
        self.config.service_name = service_name.into();
        self
    }

    /// Set the username for authentication
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    /// Set the password for authentication
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the application name
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.config.application_name = name.into();
        self
    }

    /// Set connection timeout in seconds (default: 30)
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<LogMinerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
