//! Connection seam for LogMiner sessions
//!
//! The crate does not ship an Oracle driver. Callers wire their driver of
//! choice in by implementing [`LogMinerConnection`], and hand a
//! [`ConnectionFactory`] to the session manager so each worker can open its
//! own connection from a plain [`LogMinerConfig`].

use async_trait::async_trait;

use super::config::LogMinerConfig;
use super::error::LogMinerError;

/// An open database connection able to drive DBMS_LOGMNR.
#[async_trait]
pub trait LogMinerConnection: Send + Sync {
    /// Execute a query and return the first column of every row as text,
    /// in the order the database returns them.
    async fn query_column(&self, sql: &str) -> Result<Vec<String>, LogMinerError>;

    /// Execute an anonymous PL/SQL block (`BEGIN ... END;`).
    async fn execute_block(&self, block: &str) -> Result<(), LogMinerError>;

    /// Close the connection
    async fn close(&self) -> Result<(), LogMinerError>;
}

/// Opens connections from configuration.
///
/// Implementations must not capture live resources: every worker calls
/// [`connect`](ConnectionFactory::connect) with its own copy of the config.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Connection type produced by this factory
    type Connection: LogMinerConnection;

    /// Open a new connection
    async fn connect(&self, config: &LogMinerConfig) -> Result<Self::Connection, LogMinerError>;
}

