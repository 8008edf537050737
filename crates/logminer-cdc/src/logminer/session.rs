//! LogMiner session lifecycle
//!
//! Discovers the online redo log members, registers them with
//! `DBMS_LOGMNR.ADD_LOGFILE` and starts a continuous mining session with
//! fixed options.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

use super::config::LogMinerConfig;
use super::connection::{ConnectionFactory, LogMinerConnection};
use super::error::LogMinerError;
use crate::common::{CdcConfig, Result};

/// Catalog query listing every redo log member path.
pub const LOGFILE_QUERY: &str = "SELECT DISTINCT member LOGFILENAME FROM V$LOGFILE";

/// Block terminating the mining session.
pub const END_LOGMNR_BLOCK: &str = "BEGIN DBMS_LOGMNR.END_LOGMNR; END;";

/// One redo log member, identified by its file-system path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogFileReference(String);

impl LogFileReference {
    /// Create a reference from a member path
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Member path as returned by `V$LOGFILE`
    pub fn path(&self) -> &str {
        &self.0
    }

    /// `ADD_LOGFILE` block for this member. Single quotes in the path are doubled.
    pub fn add_logfile_block(&self) -> String {
        format!(
            "BEGIN DBMS_LOGMNR.ADD_LOGFILE(LOGFILENAME => '{}', OPTIONS => DBMS_LOGMNR.ADDFILE); END;",
            self.0.replace('\'', "''")
        )
    }
}

impl fmt::Display for LogFileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options passed to `DBMS_LOGMNR.START_LOGMNR`.
///
/// Always the same three: read the dictionary from the online catalog,
/// return committed transactions only, and omit the SQL delimiter from
/// reconstructed statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningOptions {
    dict_from_online_catalog: bool,
    committed_data_only: bool,
    no_sql_delimiter: bool,
}

impl MiningOptions {
    /// The fixed option set used for every session
    pub const FIXED: Self = Self {
        dict_from_online_catalog: true,
        committed_data_only: true,
        no_sql_delimiter: true,
    };

    /// Option names as DBMS_LOGMNR constants
    pub fn flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::with_capacity(3);
        if self.dict_from_online_catalog {
            flags.push("DBMS_LOGMNR.DICT_FROM_ONLINE_CATALOG");
        }
        if self.committed_data_only {
            flags.push("DBMS_LOGMNR.COMMITTED_DATA_ONLY");
        }
        if self.no_sql_delimiter {
            flags.push("DBMS_LOGMNR.NO_SQL_DELIMITER");
        }
        flags
    }

    /// `START_LOGMNR` block with the options summed
    pub fn start_block(&self) -> String {
        format!(
            "BEGIN DBMS_LOGMNR.START_LOGMNR(OPTIONS => {}); END;",
            self.flags().join(" + ")
        )
    }
}

impl Default for MiningOptions {
    fn default() -> Self {
        Self::FIXED
    }
}

/// Lifecycle state of a [`MiningSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Log files are being registered
    Configuring,
    /// START_LOGMNR succeeded
    Mining,
    /// END_LOGMNR issued, connection closed
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuring => write!(f, "configuring"),
            Self::Mining => write!(f, "mining"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Query the catalog for every redo log member, in database order.
pub async fn discover_log_files<C>(connection: &C) -> Result<Vec<LogFileReference>, LogMinerError>
where
    C: LogMinerConnection + ?Sized,
{
    let files: Vec<LogFileReference> = connection
        .query_column(LOGFILE_QUERY)
        .await?
        .into_iter()
        .map(LogFileReference::new)
        .collect();
    debug!("Discovered {} redo log members", files.len());
    Ok(files)
}

/// A LogMiner session bound to one connection.
///
/// The session owns the connection. Call [`close`](Self::close) to issue
/// `END_LOGMNR`; a mining session that is dropped instead ends when the
/// connection does.
pub struct MiningSession<C: LogMinerConnection> {
    connection: C,
    registered: Vec<LogFileReference>,
    registered_set: HashSet<LogFileReference>,
    state: SessionState,
}

impl<C: LogMinerConnection> MiningSession<C> {
    /// Wrap an open connection in a session that is still being configured
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            registered: Vec::new(),
            registered_set: HashSet::new(),
            state: SessionState::Configuring,
        }
    }

    /// Discover, register and start mining on an already open connection.
    ///
    /// Any failure aborts setup and is returned as is; files registered
    /// before the failure are not rolled back.
    pub async fn establish(connection: C) -> Result<Self, LogMinerError> {
        let mut session = Self::new(connection);
        let files = session.discover_log_files().await?;
        for file in &files {
            session.register_log_file(file).await?;
        }
        session.start_mining().await?;
        Ok(session)
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether START_LOGMNR has succeeded and the session is not closed
    pub fn is_mining(&self) -> bool {
        self.state == SessionState::Mining
    }

    /// Log files registered so far, in registration order
    pub fn registered_log_files(&self) -> &[LogFileReference] {
        &self.registered
    }

    /// The underlying connection, for the stage reading `V$LOGMNR_CONTENTS`
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Query the catalog for every redo log member
    pub async fn discover_log_files(&self) -> Result<Vec<LogFileReference>, LogMinerError> {
        discover_log_files(&self.connection).await
    }

    /// Register one redo log member with LogMiner.
    ///
    /// Returns `false` when the file was already registered, either by this
    /// session or (ORA-01289) by an earlier one on the same connection.
    pub async fn register_log_file(
        &mut self,
        file: &LogFileReference,
    ) -> Result<bool, LogMinerError> {
        self.expect_state(SessionState::Configuring)?;

        if self.registered_set.contains(file) {
            debug!("Log file {} already registered, skipping", file);
            return Ok(false);
        }

        let newly_added = match self.connection.execute_block(&file.add_logfile_block()).await {
            Ok(()) => {
                debug!("Registered log file {}", file);
                true
            }
            Err(e) if e.is_duplicate_logfile() => {
                warn!("Log file {} was already added to LogMiner: {}", file, e);
                false
            }
            Err(e) => return Err(e),
        };

        self.registered_set.insert(file.clone());
        self.registered.push(file.clone());
        Ok(newly_added)
    }

    /// Start mining with [`MiningOptions::FIXED`].
    pub async fn start_mining(&mut self) -> Result<(), LogMinerError> {
        self.expect_state(SessionState::Configuring)?;
        if self.registered.is_empty() {
            return Err(LogMinerError::NoLogFiles);
        }

        self.connection
            .execute_block(&MiningOptions::FIXED.start_block())
            .await?;
        self.state = SessionState::Mining;
        info!(
            "LogMiner started over {} redo log files",
            self.registered.len()
        );
        Ok(())
    }

    /// End the mining session and close the connection.
    ///
    /// `END_LOGMNR` is only issued when mining was started. The connection is
    /// closed even if `END_LOGMNR` fails; the first error is returned.
    pub async fn close(mut self) -> Result<(), LogMinerError> {
        let end_result = if self.state == SessionState::Mining {
            self.connection.execute_block(END_LOGMNR_BLOCK).await
        } else {
            Ok(())
        };
        self.state = SessionState::Closed;

        let close_result = self.connection.close().await;
        info!("LogMiner session closed");
        end_result.and(close_result)
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), LogMinerError> {
        if self.state != expected {
            return Err(LogMinerError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }
}

impl<C: LogMinerConnection> Drop for MiningSession<C> {
    fn drop(&mut self) {
        if self.state == SessionState::Mining {
            warn!("LogMiner session dropped without close(); it ends when the connection closes");
        }
    }
}

impl<C: LogMinerConnection> fmt::Debug for MiningSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiningSession")
            .field("state", &self.state)
            .field("registered", &self.registered)
            .finish()
    }
}

/// Opens connections from configuration and sets up mining sessions on them.
pub struct LogMinerSessionManager<F: ConnectionFactory> {
    factory: F,
    config: LogMinerConfig,
}

impl<F: ConnectionFactory> LogMinerSessionManager<F> {
    /// Create a manager; the configuration is validated up front.
    pub fn new(factory: F, config: LogMinerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { factory, config })
    }

    /// Configuration handed to the factory on every [`open`](Self::open)
    pub fn config(&self) -> &LogMinerConfig {
        &self.config
    }

    /// The connection factory
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Open a connection and establish a mining session on it.
    pub async fn open(&self) -> Result<MiningSession<F::Connection>, LogMinerError> {
        info!(
            "Opening LogMiner connection to {}",
            self.config.connection_string()
        );
        let connection = self.factory.connect(&self.config).await?;
        MiningSession::establish(connection).await
    }
}
