//! Oracle LogMiner error types

use crate::logminer::session::SessionState;
use thiserror::Error;

/// ORA-01289: cannot add duplicate logfile
pub const ORA_DUPLICATE_LOGFILE: u32 = 1289;

/// ORA codes that indicate a lost or unusable session rather than a bad call.
const TRANSIENT_ORA_CODES: &[u32] = &[
    3113,  // end-of-file on communication channel
    3114,  // not connected to ORACLE
    3135,  // connection lost contact
    12170, // TNS connect timeout
    12537, // TNS connection closed
    12541, // TNS no listener
    12543, // TNS destination host unreachable
];

/// LogMiner-specific errors
///
/// Session operations return these unchanged so the caller sees the
/// underlying database failure.
#[derive(Error, Debug)]
pub enum LogMinerError {
    /// Connecting to the database failed
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Catalog query failed
    #[error("catalog query failed: {message}")]
    Query {
        message: String,
        sql: String,
        ora_code: Option<u32>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Administrative DBMS_LOGMNR call failed
    #[error("DBMS_LOGMNR call failed: {message}")]
    Call {
        message: String,
        ora_code: Option<u32>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Mining was requested before any redo log was registered
    #[error("no redo log files registered; LogMiner cannot be started")]
    NoLogFiles,

    /// Operation not allowed in the current session state
    #[error("invalid session state: expected {expected}, found {actual}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },
}

impl LogMinerError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query error for the given SQL.
    ///
    /// The ORA code is parsed from the message when the driver embeds one.
    pub fn query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        let message = message.into();
        Self::Query {
            ora_code: parse_ora_code(&message),
            message,
            sql: sql.into(),
            source: None,
        }
    }

    /// Create a call error, falling back to parsing the ORA code from the message.
    pub fn call(message: impl Into<String>, ora_code: Option<u32>) -> Self {
        let message = message.into();
        Self::Call {
            ora_code: ora_code.or_else(|| parse_ora_code(&message)),
            message,
            source: None,
        }
    }

    /// Create a call error with source
    pub fn call_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let message = message.into();
        Self::Call {
            ora_code: parse_ora_code(&message),
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Oracle error number, if known
    pub fn ora_code(&self) -> Option<u32> {
        match self {
            Self::Query { ora_code, .. } | Self::Call { ora_code, .. } => *ora_code,
            _ => None,
        }
    }

    /// Whether the database rejected an ADD_LOGFILE for an already added file
    pub fn is_duplicate_logfile(&self) -> bool {
        self.ora_code() == Some(ORA_DUPLICATE_LOGFILE)
    }

    /// Whether the error indicates a transient connection problem.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Query { .. } | Self::Call { .. } => self
                .ora_code()
                .is_some_and(|code| TRANSIENT_ORA_CODES.contains(&code)),
            Self::NoLogFiles | Self::InvalidState { .. } => false,
        }
    }
}

/// Extract the first `ORA-NNNNN` code from a driver message.
fn parse_ora_code(message: &str) -> Option<u32> {
    let start = message.find("ORA-")? + 4;
    let digits: String = message[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ora_code() {
        assert_eq!(
            parse_ora_code("ORA-01289: cannot add duplicate logfile /u01/redo01.log"),
            Some(1289)
        );
        assert_eq!(
            parse_ora_code("ORA-06512: at \"SYS.DBMS_LOGMNR\", line 82"),
            Some(6512)
        );
        assert_eq!(parse_ora_code("generic driver failure"), None);
        assert_eq!(parse_ora_code("ORA-"), None);
    }

    #[test]
    fn test_duplicate_logfile_detection() {
        let err = LogMinerError::call("ORA-01289: cannot add duplicate logfile", None);
        assert!(err.is_duplicate_logfile());

        let err = LogMinerError::call("insufficient privileges", Some(1031));
        assert!(!err.is_duplicate_logfile());
        assert_eq!(err.ora_code(), Some(1031));
    }

    #[test]
    fn test_retriable() {
        assert!(LogMinerError::connection("listener refused").is_retriable());
        assert!(LogMinerError::call("ORA-03113: end-of-file on communication channel", None)
            .is_retriable());
        assert!(!LogMinerError::call("ORA-01031: insufficient privileges", None).is_retriable());
        assert!(!LogMinerError::NoLogFiles.is_retriable());
    }

    #[test]
    fn test_error_messages() {
        let err = LogMinerError::query("ORA-00942: table or view does not exist", "SELECT 1");
        assert!(err.to_string().contains("ORA-00942"));
        assert_eq!(err.ora_code(), Some(942));

        let err = LogMinerError::InvalidState {
            expected: SessionState::Configuring,
            actual: SessionState::Mining,
        };
        assert_eq!(
            err.to_string(),
            "invalid session state: expected configuring, found mining"
        );
    }
}
