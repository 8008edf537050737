//! # logminer-cdc - Oracle LogMiner capture core
//!
//! Two halves of an Oracle change data capture path:
//!
//! - [`logminer`] - brings up a LogMiner session on a live connection
//!   (discover redo log members, register them, start mining, tear down)
//! - [`normalize`] - turns GoldenGate-style Avro change envelopes into
//!   canonical DDL/DML records
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  V$LOGFILE   ┌───────────────┐
//! │   Oracle DB  │◀─────────────│ MiningSession │  ADD_LOGFILE / START_LOGMNR
//! └──────────────┘              └───────────────┘
//!
//! ┌───────────────┐  classify  ┌─────────────────┐  fingerprint  ┌─────────────┐
//! │ InboundRecord │───────────▶│ChangeNormalizer │──────────────▶│ SchemaCache │
//! └───────────────┘            └─────────────────┘               └─────────────┘
//!                                       │
//!                                       ▼
//!                        CanonicalRecord::{Ddl, Dml}
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use logminer_cdc::normalize::{ChangeNormalizer, InboundRecord, NormalizerConfig, SchemaCache};
//!
//! let normalizer = ChangeNormalizer::new(NormalizerConfig::default(), Arc::new(SchemaCache::empty()));
//!
//! // Session markers carry no data
//! let marker = InboundRecord::new(Some("GenericWrapperSchema")).with_field("message", Vec::new());
//! assert!(normalizer.process(marker).unwrap().is_none());
//! ```
//!
//! The database driver is not part of this crate: implement
//! [`logminer::LogMinerConnection`] and [`logminer::ConnectionFactory`] over
//! the Oracle client of your choice.

pub mod common;
pub mod logminer;
pub mod normalize;

pub use common::{CdcConfig, CdcError, ErrorCategory, Result};
pub use logminer::{LogMinerConfig, LogMinerError, LogMinerSessionManager, MiningSession};
pub use normalize::{CanonicalRecord, ChangeNormalizer, NormalizerConfig, SchemaCache};
