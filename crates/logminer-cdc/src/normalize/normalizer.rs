//! Canonical DDL/DML normalization
//!
//! Two steps run for every change event:
//!
//! 1. **Schema normalization**: the `before` image schema is the
//!    authoritative column list. `_isMissing` companions are dropped and the
//!    remaining fields, in order, become a record named `columns`.
//! 2. **Row normalization**: the table name is flattened (`.` to `_`) and the
//!    change set is selected by op type:
//!
//! | Op | Source image | Columns kept |
//! |----|--------------|--------------|
//! | `I` | after | all |
//! | `U` | after | only columns whose `_isMissing` flag is not `true` |
//! | `D` | before | all |
//! | other | none | none (or an error in strict mode) |

use std::sync::Arc;

use apache_avro::types::Value as AvroValue;
use serde_json::Value as JsonValue;
use tracing::{debug, trace, warn};

use super::config::NormalizerConfig;
use super::envelope::{
    DdlDocument, DecodedRowImage, EnvelopeDecoder, InboundEnvelope, InboundRecord, RowImage,
};
use super::record::{CanonicalRecord, ChangeField, ChangeRecord, DdlRecord, DmlRecord};
use super::schema_cache::SchemaCache;
use super::{BEFORE_FIELD, COLUMNS_RECORD_NAME, ISMISSING_SUFFIX};
use crate::common::{CdcError, NormalizerMetrics, Result};

/// Whether a field is an `_isMissing` companion rather than a column.
pub fn is_missing_companion(name: &str) -> bool {
    name.ends_with(ISMISSING_SUFFIX)
}

/// Flatten `SCHEMA.TABLE` into `SCHEMA_TABLE`.
pub fn normalize_table_name(table: &str) -> String {
    table.replace('.', "_")
}

/// Operation type of a row change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpType {
    /// `I`
    Insert,
    /// `U`
    Update,
    /// `D`
    Delete,
    /// Anything else, kept verbatim
    Other(String),
}

impl OpType {
    /// Parse the single-letter op code
    pub fn parse(op: &str) -> Self {
        match op {
            "I" => Self::Insert,
            "U" => Self::Update,
            "D" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }

    /// Op code as carried on the wire
    pub fn as_str(&self) -> &str {
        match self {
            Self::Insert => "I",
            Self::Update => "U",
            Self::Delete => "D",
            Self::Other(op) => op,
        }
    }

    /// Whether this is one of I/U/D
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// One column of the canonical schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    name: String,
    field_type: JsonValue,
    definition: JsonValue,
}

impl ColumnSchema {
    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared Avro type, as JSON
    pub fn field_type(&self) -> &JsonValue {
        &self.field_type
    }

    /// Full field definition (name, type, default, doc)
    pub fn definition(&self) -> &JsonValue {
        &self.definition
    }
}

/// The canonical column schema of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSchema {
    columns: Vec<ColumnSchema>,
    document: String,
}

impl CanonicalSchema {
    /// Derive the canonical schema from a schema document.
    ///
    /// Accepts either a change-record schema with a `before` field, or an
    /// already canonical `columns` record. The canonical shape wins, so a
    /// table with a column called `before` still round-trips.
    pub fn from_document(document: &str) -> Result<Self> {
        let json: JsonValue = serde_json::from_str(document)
            .map_err(|e| CdcError::schema(format!("schema document is not valid JSON: {}", e)))?;
        let fields = record_fields(&json)
            .ok_or_else(|| CdcError::schema("schema document is not a record"))?;

        let column_fields = if is_canonical_shape(&json) {
            fields
        } else {
            fields
                .iter()
                .find(|f| f.get("name").and_then(JsonValue::as_str) == Some(BEFORE_FIELD))
                .ok_or_else(|| CdcError::schema("schema document has no 'before' field"))?
                .get("type")
                .and_then(non_null_record)
                .and_then(record_fields)
                .ok_or_else(|| CdcError::schema("'before' field does not define a record"))?
        };

        let mut columns = Vec::with_capacity(column_fields.len());
        for field in column_fields {
            let name = field
                .get("name")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| CdcError::schema("column definition without a name"))?;
            if is_missing_companion(name) {
                continue;
            }
            columns.push(ColumnSchema {
                name: name.to_string(),
                field_type: field.get("type").cloned().unwrap_or(JsonValue::Null),
                definition: field.clone(),
            });
        }

        let document = serde_json::json!({
            "type": "record",
            "name": COLUMNS_RECORD_NAME,
            "fields": columns.iter().map(|c| c.definition.clone()).collect::<Vec<_>>(),
        })
        .to_string();
        trace!("Canonical schema: {}", document);

        Ok(Self { columns, document })
    }

    /// Serialized canonical schema
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Columns in declaration order
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Column by name
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A top-level `columns` record without a namespace, as emitted below.
fn is_canonical_shape(json: &JsonValue) -> bool {
    json.get("name").and_then(JsonValue::as_str) == Some(COLUMNS_RECORD_NAME)
        && json.get("namespace").is_none()
}

fn record_fields(value: &JsonValue) -> Option<&Vec<JsonValue>> {
    if value.get("type").and_then(JsonValue::as_str) != Some("record") {
        return None;
    }
    value.get("fields").and_then(JsonValue::as_array)
}

/// The record branch of a field type, looking through `["null", {...}]`.
fn non_null_record(ty: &JsonValue) -> Option<&JsonValue> {
    match ty {
        JsonValue::Object(_) => record_fields(ty).map(|_| ty),
        JsonValue::Array(branches) => branches.iter().find_map(non_null_record),
        _ => None,
    }
}

/// Normalize a schema document into the canonical `columns` schema.
///
/// Idempotent: normalizing an already canonical document returns it as is.
pub fn normalize_schema(document: &str) -> Result<String> {
    Ok(CanonicalSchema::from_document(document)?.document)
}

/// Build the DDL record for a schema-change payload.
pub fn normalize_ddl(payload: &[u8]) -> Result<DdlRecord> {
    let ddl = DdlDocument::parse(payload)?;
    Ok(DdlRecord {
        table: ddl.table,
        schema: normalize_schema(&ddl.document)?,
    })
}

/// Reshape a decoded row into a DML record.
///
/// Unknown op types yield an empty change set unless `strict_op_types` is
/// set, in which case they fail with [`CdcError::UnrecognizedOperation`].
pub fn normalize_row(
    row: DecodedRowImage,
    schema: &CanonicalSchema,
    strict_op_types: bool,
) -> Result<DmlRecord> {
    let table = normalize_table_name(&row.table);

    let selected = match OpType::parse(&row.op_type) {
        OpType::Insert => all_columns(row.after),
        OpType::Update => row.after.map(present_columns).unwrap_or_default(),
        OpType::Delete => all_columns(row.before),
        OpType::Other(op) => {
            if strict_op_types {
                return Err(CdcError::UnrecognizedOperation(op));
            }
            debug!("Unrecognized op type '{}' for {}, emitting empty change", op, table);
            Vec::new()
        }
    };

    let mut change = ChangeRecord::default();
    for (name, value) in selected {
        match schema.column(&name) {
            Some(column) => change.push(ChangeField {
                name,
                field_type: column.field_type().clone(),
                value,
            }),
            None => warn!(
                "Column {} of {} is not in the canonical schema, dropping it",
                name, table
            ),
        }
    }

    Ok(DmlRecord {
        table,
        schema: schema.document().to_string(),
        op_type: row.op_type,
        primary_keys: row.primary_keys,
        change,
    })
}

fn all_columns(image: Option<RowImage>) -> Vec<(String, AvroValue)> {
    image
        .map(|image| {
            image
                .into_fields()
                .into_iter()
                .filter(|(name, _)| !is_missing_companion(name))
                .collect()
        })
        .unwrap_or_default()
}

fn present_columns(image: RowImage) -> Vec<(String, AvroValue)> {
    let keep: Vec<bool> = image
        .iter()
        .map(|(name, _)| !is_missing_companion(name) && !image.is_missing(name))
        .collect();
    image
        .into_fields()
        .into_iter()
        .zip(keep)
        .filter_map(|(field, keep)| keep.then_some(field))
        .collect()
}

/// Turns inbound records into canonical DDL/DML records.
///
/// Holds a read-only schema cache snapshot; swap it with
/// [`set_schema_cache`](Self::set_schema_cache) when a new batch starts.
pub struct ChangeNormalizer {
    config: NormalizerConfig,
    cache: Arc<SchemaCache>,
    metrics: Arc<NormalizerMetrics>,
}

impl ChangeNormalizer {
    /// Create a normalizer over a schema cache snapshot
    pub fn new(config: NormalizerConfig, cache: Arc<SchemaCache>) -> Self {
        Self {
            config,
            cache,
            metrics: Arc::new(NormalizerMetrics::default()),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Current schema cache snapshot
    pub fn schema_cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    /// Builder form of [`set_schema_cache`](Self::set_schema_cache)
    pub fn with_schema_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.set_schema_cache(cache);
        self
    }

    /// Replace the schema cache snapshot
    pub fn set_schema_cache(&mut self, cache: Arc<SchemaCache>) {
        debug!("Installing schema cache snapshot with {} entries", cache.len());
        self.cache = cache;
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> &Arc<NormalizerMetrics> {
        &self.metrics
    }

    /// Normalize one inbound record.
    ///
    /// Returns `None` for the marker kind.
    pub fn process(&self, record: InboundRecord) -> Result<Option<CanonicalRecord>> {
        self.metrics.record_received();
        let result = self.process_record(record);
        if let Err(e) = &result {
            self.metrics.record_error(e);
        }
        result
    }

    fn process_record(&self, record: InboundRecord) -> Result<Option<CanonicalRecord>> {
        match InboundEnvelope::classify(record, self.config.input_field())? {
            InboundEnvelope::Marker => {
                trace!("Dropping generic wrapper marker");
                self.metrics.record_marker();
                Ok(None)
            }
            InboundEnvelope::Ddl(payload) => {
                let ddl = normalize_ddl(&payload)?;
                debug!("Normalized schema change for {}", ddl.table);
                self.metrics.record_ddl();
                Ok(Some(CanonicalRecord::Ddl(ddl)))
            }
            InboundEnvelope::DataWrapper(payload) => {
                let decoded = EnvelopeDecoder::new(&self.cache).decode(&payload)?;
                trace!(
                    "Got table {} and fingerprint {} in wrapped envelope",
                    decoded.table_name,
                    decoded.schema.fingerprint()
                );
                let known_op = OpType::parse(&decoded.row.op_type).is_known();
                let dml = normalize_row(
                    decoded.row,
                    decoded.schema.canonical(),
                    self.config.strict_op_types,
                )?;
                if !known_op {
                    self.metrics.record_unknown_op();
                }
                self.metrics.record_dml();
                Ok(Some(CanonicalRecord::Dml(dml)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ORDERS_SCHEMA: &str = r#"{
        "type": "record",
        "name": "ORDERS",
        "namespace": "SALES",
        "fields": [
            {"name": "table", "type": "string"},
            {"name": "op_type", "type": "string"},
            {"name": "primary_keys", "type": {"type": "array", "items": "string"}},
            {"name": "before", "type": ["null", {
                "type": "record",
                "name": "columns",
                "fields": [
                    {"name": "id", "type": "long"},
                    {"name": "id_isMissing", "type": "boolean"},
                    {"name": "name", "type": ["null", "string"], "default": null},
                    {"name": "name_isMissing", "type": "boolean"},
                    {"name": "amount", "type": ["null", "double"], "default": null},
                    {"name": "amount_isMissing", "type": "boolean"}
                ]
            }], "default": null},
            {"name": "after", "type": ["null", "columns"], "default": null}
        ]
    }"#;

    fn canonical() -> CanonicalSchema {
        CanonicalSchema::from_document(ORDERS_SCHEMA).unwrap()
    }

    fn image(id: i64, name: Option<&str>, amount_missing: bool) -> RowImage {
        RowImage::new(vec![
            ("id".to_string(), AvroValue::Long(id)),
            ("id_isMissing".to_string(), AvroValue::Boolean(false)),
            (
                "name".to_string(),
                match name {
                    Some(n) => AvroValue::Union(1, Box::new(AvroValue::String(n.to_string()))),
                    None => AvroValue::Union(0, Box::new(AvroValue::Null)),
                },
            ),
            ("name_isMissing".to_string(), AvroValue::Boolean(name.is_none())),
            (
                "amount".to_string(),
                AvroValue::Union(0, Box::new(AvroValue::Null)),
            ),
            (
                "amount_isMissing".to_string(),
                AvroValue::Boolean(amount_missing),
            ),
        ])
    }

    fn lenient(row: DecodedRowImage) -> DmlRecord {
        normalize_row(row, &canonical(), false).unwrap()
    }

    fn row(op: &str, before: Option<RowImage>, after: Option<RowImage>) -> DecodedRowImage {
        DecodedRowImage {
            table: "SALES.ORDERS".to_string(),
            primary_keys: vec!["id".to_string()],
            op_type: op.to_string(),
            before,
            after,
        }
    }

    #[test]
    fn test_canonical_schema_strips_companions() {
        let schema = canonical();
        assert_eq!(schema.column_names(), vec!["id", "name", "amount"]);
        assert_eq!(
            schema.column("name").unwrap().field_type(),
            &serde_json::json!(["null", "string"])
        );

        let json: JsonValue = serde_json::from_str(schema.document()).unwrap();
        assert_eq!(json["name"], "columns");
        assert_eq!(json["type"], "record");
        assert_eq!(json["fields"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_normalize_schema_idempotent() {
        let once = normalize_schema(ORDERS_SCHEMA).unwrap();
        let twice = normalize_schema(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_schema_idempotent_with_before_column() {
        let document = r#"{
            "type": "record",
            "name": "AUDIT",
            "namespace": "HR",
            "fields": [
                {"name": "before", "type": ["null", {
                    "type": "record",
                    "name": "columns",
                    "fields": [
                        {"name": "id", "type": "long"},
                        {"name": "before", "type": ["null", "string"], "default": null},
                        {"name": "before_isMissing", "type": "boolean"}
                    ]
                }], "default": null},
                {"name": "after", "type": ["null", "columns"], "default": null}
            ]
        }"#;

        let once = normalize_schema(document).unwrap();
        let schema = CanonicalSchema::from_document(&once).unwrap();
        assert_eq!(schema.column_names(), vec!["id", "before"]);
        assert_eq!(normalize_schema(&once).unwrap(), once);
    }

    #[test]
    fn test_normalize_schema_errors() {
        assert!(normalize_schema("[]").is_err());
        assert!(normalize_schema(r#"{"type":"record","name":"T","fields":[]}"#).is_err());
        assert!(normalize_schema(
            r#"{"type":"record","name":"T","fields":[{"name":"before","type":"string"}]}"#
        )
        .is_err());
    }

    #[test]
    fn test_table_name_flattening() {
        assert_eq!(normalize_table_name("SALES.ORDERS"), "SALES_ORDERS");
        assert_eq!(normalize_table_name("A.B.C"), "A_B_C");
        assert_eq!(normalize_table_name("PLAIN"), "PLAIN");
    }

    #[test]
    fn test_op_type_parse() {
        assert_eq!(OpType::parse("I"), OpType::Insert);
        assert_eq!(OpType::parse("U"), OpType::Update);
        assert_eq!(OpType::parse("D"), OpType::Delete);
        assert_eq!(OpType::parse("T"), OpType::Other("T".into()));
        assert_eq!(OpType::parse("T").as_str(), "T");
        assert!(!OpType::parse("").is_known());
    }

    #[test]
    fn test_insert_takes_full_after_image() {
        let dml = lenient(row("I", None, Some(image(1, Some("x"), true))));
        assert_eq!(dml.table, "SALES_ORDERS");
        assert_eq!(dml.op_type, "I");
        assert_eq!(dml.primary_keys, vec!["id"]);
        assert_eq!(dml.change.names(), vec!["id", "name", "amount"]);
        assert_eq!(dml.schema, canonical().document());
    }

    #[test]
    fn test_update_omits_missing_columns() {
        let dml = lenient(row("U", None, Some(image(1, Some("x"), true))));
        assert_eq!(dml.change.names(), vec!["id", "name"]);
        assert_eq!(
            dml.change.to_json().unwrap(),
            serde_json::json!({"id": 1, "name": "x"})
        );
        assert!(dml.change.get("amount").is_none());
    }

    #[test]
    fn test_update_keeps_present_null() {
        let dml = lenient(row("U", None, Some(image(1, Some("x"), false))));
        assert_eq!(dml.change.names(), vec!["id", "name", "amount"]);
        assert_eq!(
            dml.change.get("amount").map(|f| &f.value),
            Some(&AvroValue::Union(0, Box::new(AvroValue::Null)))
        );
    }

    #[test]
    fn test_delete_uses_before_image() {
        let dml = normalize_row(
            row("D", Some(image(7, Some("old"), true)), Some(image(8, None, true))),
            &canonical(),
            false,
        )
        .unwrap();
        assert_eq!(dml.change.names(), vec!["id", "name", "amount"]);
        assert_eq!(dml.change.get("id").map(|f| &f.value), Some(&AvroValue::Long(7)));
    }

    #[test]
    fn test_unknown_op_is_empty_change() {
        let dml = lenient(row("X", None, Some(image(1, None, false))));
        assert!(dml.change.is_empty());
        assert_eq!(dml.op_type, "X");
    }

    #[test]
    fn test_unknown_op_strict() {
        let err = normalize_row(row("X", None, None), &canonical(), true).unwrap_err();
        assert!(matches!(err, CdcError::UnrecognizedOperation(op) if op == "X"));
    }

    #[test]
    fn test_change_fields_carry_declared_type() {
        let dml = lenient(row("I", None, Some(image(1, Some("x"), false))));
        let id = dml.change.get("id").unwrap();
        assert_eq!(id.field_type, serde_json::json!("long"));
    }

    #[test]
    fn test_columns_outside_schema_are_dropped() {
        let mut fields = image(1, Some("x"), false).into_fields();
        fields.push(("extra".to_string(), AvroValue::Int(3)));
        let dml = lenient(row("I", None, Some(RowImage::new(fields))));
        assert!(dml.change.get("extra").is_none());
    }

    #[test]
    fn test_normalize_ddl() {
        let ddl = normalize_ddl(ORDERS_SCHEMA.as_bytes()).unwrap();
        assert_eq!(ddl.table, "SALES_ORDERS");
        assert_eq!(ddl.schema, normalize_schema(ORDERS_SCHEMA).unwrap());
    }
}
