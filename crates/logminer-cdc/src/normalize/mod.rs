//! # Change envelope normalization
//!
//! Turns GoldenGate-style change records into canonical DDL/DML records.
//!
//! ## Flow
//!
//! ```text
//! ┌───────────────┐   classify    ┌──────────────────┐
//! │ InboundRecord │──────────────▶│ InboundEnvelope  │
//! └───────────────┘               └──────────────────┘
//!                                   │      │       │
//!                          Marker ◀─┘      │       └─▶ DataWrapper
//!                          (dropped)       ▼               │
//!                                   DDL schema doc         │ fingerprint
//!                                          │               ▼
//!                                          │        ┌─────────────┐
//!                                          │        │ SchemaCache │
//!                                          │        └─────────────┘
//!                                          ▼               │
//!                                      DdlRecord       DmlRecord
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use logminer_cdc::normalize::{ChangeNormalizer, InboundRecord, NormalizerConfig, SchemaCache};
//!
//! # fn run(state_json: &str, bytes: Vec<u8>) -> logminer_cdc::common::Result<()> {
//! let cache = Arc::new(SchemaCache::from_state_json(state_json)?);
//! let normalizer = ChangeNormalizer::new(NormalizerConfig::default(), cache);
//!
//! let record = InboundRecord::new(Some("SALES.ORDERS")).with_field("message", bytes);
//! if let Some(output) = normalizer.process(record)? {
//!     println!("{}", output.to_json()?);
//! }
//! # Ok(())
//! # }
//! ```

mod avro;
mod config;
mod envelope;
mod normalizer;
mod record;
mod schema_cache;

/// Suffix of the companion flag telling whether a column was captured
pub const ISMISSING_SUFFIX: &str = "_isMissing";

/// Field of a change-record schema holding the pre-image
pub const BEFORE_FIELD: &str = "before";

/// Record name of the canonical column schema
pub const COLUMNS_RECORD_NAME: &str = "columns";

pub use avro::{avro_to_json, column_to_json};
pub use config::{NormalizerConfig, DEFAULT_INPUT_FIELD};
pub use envelope::{
    decode_row, decode_wrapper, DdlDocument, DecodedChange, DecodedRowImage, EnvelopeDecoder,
    InboundEnvelope, InboundRecord, RowImage, WrappedChangeEnvelope, DDL_RECORD_NAME,
    GENERIC_WRAPPER_RECORD_NAME, GENERIC_WRAPPER_SCHEMA,
};
pub use normalizer::{
    is_missing_companion, normalize_ddl, normalize_row, normalize_schema, normalize_table_name,
    CanonicalSchema, ChangeNormalizer, ColumnSchema, OpType,
};
pub use record::{CanonicalRecord, ChangeField, ChangeRecord, DdlRecord, DmlRecord};
pub use schema_cache::{CachedSchema, SchemaCache, SchemaFingerprint, SchemaStateRecord};
