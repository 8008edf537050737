//! Inbound envelope classification and decoding
//!
//! Records arrive in three mutually exclusive kinds, told apart by the
//! record name carried with them:
//!
//! | Record name | Kind | Payload |
//! |-------------|------|---------|
//! | `GenericWrapperSchema` | [`InboundEnvelope::Marker`] | none used, dropped |
//! | `DDLRecord` | [`InboundEnvelope::Ddl`] | JSON Avro schema of the table |
//! | anything else / absent | [`InboundEnvelope::DataWrapper`] | Avro generic wrapper |
//!
//! The generic wrapper is itself an Avro record whose `payload` is the row,
//! encoded with the schema the `schema_fingerprint` points at.

use std::collections::HashMap;
use std::sync::OnceLock;

use apache_avro::types::Value as AvroValue;
use apache_avro::Schema as AvroSchema;
use tracing::trace;

use super::avro::{
    into_record, take_bytes, take_field, take_long, take_string, take_string_array, unwrap_union,
    unwrap_union_ref,
};
use super::schema_cache::{CachedSchema, SchemaCache, SchemaFingerprint};
use super::ISMISSING_SUFFIX;
use crate::common::{CdcError, Result};

/// Record name of the session-metadata marker
pub const GENERIC_WRAPPER_RECORD_NAME: &str = "GenericWrapperSchema";

/// Record name of schema-change records
pub const DDL_RECORD_NAME: &str = "DDLRecord";

/// Avro schema of the generic wrapper envelope.
pub const GENERIC_WRAPPER_SCHEMA: &str = r#"{
    "type": "record",
    "name": "generic_wrapper",
    "namespace": "oracle.goldengate",
    "fields": [
        {"name": "table_name", "type": "string"},
        {"name": "schema_fingerprint", "type": "long"},
        {"name": "payload", "type": "bytes"}
    ]
}"#;

fn generic_wrapper_schema() -> &'static AvroSchema {
    static SCHEMA: OnceLock<AvroSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        AvroSchema::parse_str(GENERIC_WRAPPER_SCHEMA).expect("generic wrapper schema is valid")
    })
}

/// A record as handed over by the host pipeline.
#[derive(Debug, Clone, Default)]
pub struct InboundRecord {
    record_name: Option<String>,
    fields: HashMap<String, Vec<u8>>,
}

impl InboundRecord {
    /// Create a record with the given discriminating record name
    pub fn new(record_name: Option<impl Into<String>>) -> Self {
        Self {
            record_name: record_name.map(Into::into),
            fields: HashMap::new(),
        }
    }

    /// Add a binary field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Record name used to pick the envelope kind
    pub fn record_name(&self) -> Option<&str> {
        self.record_name.as_deref()
    }

    /// Binary field by name
    pub fn field(&self, name: &str) -> Option<&[u8]> {
        self.fields.get(name).map(Vec::as_slice)
    }
}

/// Inbound record classified by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEnvelope {
    /// Session metadata; produces no output
    Marker,
    /// JSON schema document of a table
    Ddl(Vec<u8>),
    /// Avro-encoded generic wrapper
    DataWrapper(Vec<u8>),
}

impl InboundEnvelope {
    /// Classify a record, taking its payload from `input_field`.
    ///
    /// The payload field is required for every kind, including the marker.
    pub fn classify(mut record: InboundRecord, input_field: &str) -> Result<Self> {
        let payload = record
            .fields
            .remove(input_field)
            .ok_or_else(|| CdcError::missing_input_field(input_field))?;

        Ok(match record.record_name.as_deref() {
            Some(GENERIC_WRAPPER_RECORD_NAME) => Self::Marker,
            Some(DDL_RECORD_NAME) => Self::Ddl(payload),
            _ => Self::DataWrapper(payload),
        })
    }

    /// Short kind label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Ddl(_) => "ddl",
            Self::DataWrapper(_) => "dml",
        }
    }
}

/// The decoded generic wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedChangeEnvelope {
    /// Fully qualified source table (`SCHEMA.TABLE`)
    pub table_name: String,
    /// Fingerprint of the schema `payload` was written with
    pub schema_fingerprint: SchemaFingerprint,
    /// Avro-encoded row
    pub payload: Vec<u8>,
}

impl WrappedChangeEnvelope {
    /// Decode a generic wrapper from Avro binary.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let value = apache_avro::from_avro_datum(generic_wrapper_schema(), &mut reader, None)?;
        let mut fields = into_record(value, "generic wrapper")?;

        let envelope = Self {
            table_name: take_string(&mut fields, "table_name")?,
            schema_fingerprint: take_long(&mut fields, "schema_fingerprint")?.into(),
            payload: take_bytes(&mut fields, "payload")?,
        };
        trace!(
            "Decoded wrapper for table {} with fingerprint {}",
            envelope.table_name,
            envelope.schema_fingerprint
        );
        Ok(envelope)
    }

    /// Encode as Avro binary with the generic wrapper schema.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let value = AvroValue::Record(vec![
            (
                "table_name".to_string(),
                AvroValue::String(self.table_name.clone()),
            ),
            (
                "schema_fingerprint".to_string(),
                AvroValue::Long(self.schema_fingerprint.value()),
            ),
            ("payload".to_string(), AvroValue::Bytes(self.payload.clone())),
        ]);
        Ok(apache_avro::to_avro_datum(generic_wrapper_schema(), value)?)
    }
}

/// One before or after image: the table's columns plus their
/// `_isMissing` companions, in schema order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowImage {
    fields: Vec<(String, AvroValue)>,
}

impl RowImage {
    /// Create from decoded record fields
    pub fn new(fields: Vec<(String, AvroValue)>) -> Self {
        Self { fields }
    }

    /// Value of a field
    pub fn get(&self, name: &str) -> Option<&AvroValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether the change event did not capture `column`.
    ///
    /// Only an explicit `true` companion counts as missing.
    pub fn is_missing(&self, column: &str) -> bool {
        let flag = format!("{}{}", column, ISMISSING_SUFFIX);
        matches!(
            self.get(&flag).map(unwrap_union_ref),
            Some(AvroValue::Boolean(true))
        )
    }

    /// All fields, companions included
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AvroValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Consume into the field list
    pub fn into_fields(self) -> Vec<(String, AvroValue)> {
        self.fields
    }

    /// Number of fields, companions included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the image has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A row payload decoded against its resolved schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRowImage {
    /// Source table (`SCHEMA.TABLE`)
    pub table: String,
    /// Primary key column names, in key order
    pub primary_keys: Vec<String>,
    /// Raw operation type (`I`, `U`, `D`, ...)
    pub op_type: String,
    /// Pre-image, absent for inserts
    pub before: Option<RowImage>,
    /// Post-image, absent for deletes
    pub after: Option<RowImage>,
}

impl DecodedRowImage {
    /// Decode a row payload with the given writer schema.
    pub fn decode(payload: &[u8], schema: &AvroSchema) -> Result<Self> {
        let mut reader = payload;
        let value = apache_avro::from_avro_datum(schema, &mut reader, None)?;
        Self::from_avro(value)
    }

    /// Build from an already decoded row record.
    pub fn from_avro(value: AvroValue) -> Result<Self> {
        let mut fields = into_record(value, "row payload")?;
        Ok(Self {
            table: take_string(&mut fields, "table")?,
            primary_keys: take_string_array(&mut fields, "primary_keys")?,
            op_type: take_string(&mut fields, "op_type")?,
            before: take_image(&mut fields, "before")?,
            after: take_image(&mut fields, "after")?,
        })
    }
}

fn take_image(fields: &mut Vec<(String, AvroValue)>, name: &str) -> Result<Option<RowImage>> {
    match take_field(fields, name).map(unwrap_union) {
        None | Some(AvroValue::Null) => Ok(None),
        Some(value) => Ok(Some(RowImage::new(into_record(value, name)?))),
    }
}

/// Decode the generic wrapper of a data record.
pub fn decode_wrapper(bytes: &[u8]) -> Result<WrappedChangeEnvelope> {
    WrappedChangeEnvelope::decode(bytes)
}

/// Resolve the envelope's fingerprint, then decode its row payload.
///
/// The fingerprint is resolved before the payload is touched, so a missing
/// schema fails without any partial decode.
pub fn decode_row<'a>(
    envelope: &WrappedChangeEnvelope,
    cache: &'a SchemaCache,
) -> Result<(DecodedRowImage, &'a CachedSchema)> {
    let schema = cache.resolve(envelope.schema_fingerprint)?;
    let row = DecodedRowImage::decode(&envelope.payload, schema.avro())?;
    Ok((row, schema))
}

/// Decodes generic wrappers against a schema cache snapshot.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeDecoder<'a> {
    cache: &'a SchemaCache,
}

/// Output of [`EnvelopeDecoder::decode`].
#[derive(Debug, Clone)]
pub struct DecodedChange<'a> {
    /// Table name carried by the wrapper
    pub table_name: String,
    /// Decoded row
    pub row: DecodedRowImage,
    /// Schema the row was decoded with
    pub schema: &'a CachedSchema,
}

impl<'a> EnvelopeDecoder<'a> {
    /// Create a decoder over a cache snapshot
    pub fn new(cache: &'a SchemaCache) -> Self {
        Self { cache }
    }

    /// Decode a generic wrapper and its row payload.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedChange<'a>> {
        let envelope = decode_wrapper(bytes)?;
        let (row, schema) = decode_row(&envelope, self.cache)?;
        Ok(DecodedChange {
            table_name: envelope.table_name,
            row,
            schema,
        })
    }
}

/// Table identity of a DDL payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlDocument {
    /// `namespace_name`
    pub table: String,
    /// The schema document itself
    pub document: String,
}

impl DdlDocument {
    /// Parse a UTF-8 JSON schema document and derive its table identifier.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let document = std::str::from_utf8(bytes)
            .map_err(|e| CdcError::serialization(format!("DDL payload is not UTF-8: {}", e)))?
            .to_string();
        let json: serde_json::Value = serde_json::from_str(&document)?;

        let namespace = json
            .get("namespace")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CdcError::schema("DDL schema has no 'namespace'"))?;
        let name = json
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CdcError::schema("DDL schema has no 'name'"))?;

        Ok(Self {
            table: format!("{}_{}", namespace, name),
            document,
        })
    }
}
