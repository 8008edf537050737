//! # Oracle LogMiner Session Management
//!
//! Configures Oracle LogMiner against the current online redo logs and
//! starts a continuous mining session on a caller-supplied connection.
//!
//! ## Session Setup
//!
//! ```text
//! ┌────────────┐    ┌─────────────────────────┐    ┌──────────────────────────┐
//! │ V$LOGFILE  │───▶│ DBMS_LOGMNR.ADD_LOGFILE │───▶│ DBMS_LOGMNR.START_LOGMNR │
//! │ (discover) │    │ (one call per member)   │    │ (fixed options)          │
//! └────────────┘    └─────────────────────────┘    └──────────────────────────┘
//! ```
//!
//! `START_LOGMNR` always runs with:
//!
//! | Option | Effect |
//! |--------|--------|
//! | `DICT_FROM_ONLINE_CATALOG` | Resolve object names from the live data dictionary |
//! | `COMMITTED_DATA_ONLY` | Only return rows of committed transactions |
//! | `NO_SQL_DELIMITER` | Strip the trailing `;` from reconstructed SQL |
//!
//! ## Drivers
//!
//! No Oracle driver is bundled. Implement [`LogMinerConnection`] over the
//! driver of your choice and a [`ConnectionFactory`] that opens it from a
//! [`LogMinerConfig`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use logminer_cdc::logminer::{LogMinerConfig, LogMinerSessionManager};
//!
//! let config = LogMinerConfig::builder()
//!     .host("oracle.internal")
//!     .service_name("ORCLPDB1")
//!     .username("c##miner")
//!     .password("secret")
//!     .build()?;
//!
//! let manager = LogMinerSessionManager::new(MyOracleFactory, config)?;
//! let session = manager.open().await?;
//! // ... read V$LOGMNR_CONTENTS through session.connection() ...
//! session.close().await?;
//! ```
//!
//! ## Oracle Requirements
//!
//! 1. **ARCHIVELOG mode and supplemental logging**:
//!    ```sql
//!    ALTER DATABASE ADD SUPPLEMENTAL LOG DATA;
//!    ```
//!
//! 2. **Privileges for the mining user**:
//!    ```sql
//!    GRANT LOGMINING, EXECUTE_CATALOG_ROLE, SELECT ANY DICTIONARY TO c##miner;
//!    ```

mod config;
mod connection;
mod error;
mod session;

pub use config::{LogMinerConfig, LogMinerConfigBuilder};
pub use connection::{ConnectionFactory, LogMinerConnection};
pub use error::{LogMinerError, ORA_DUPLICATE_LOGFILE};
pub use session::{
    discover_log_files, LogFileReference, LogMinerSessionManager, MiningOptions, MiningSession,
    SessionState, END_LOGMNR_BLOCK, LOGFILE_QUERY,
};
