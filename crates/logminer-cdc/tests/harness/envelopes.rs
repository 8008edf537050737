//! Builders for wrapped change envelopes

use apache_avro::types::Value;
use apache_avro::Schema;
use logminer_cdc::normalize::{
    InboundRecord, SchemaCache, SchemaFingerprint, WrappedChangeEnvelope, DDL_RECORD_NAME,
    GENERIC_WRAPPER_RECORD_NAME,
};

/// Fingerprint the `SALES.ORDERS` schema is registered under
pub const ORDERS_FINGERPRINT: i64 = 42;

/// Change-record schema of `SALES.ORDERS`; `id` has no `_isMissing` companion.
pub const ORDERS_SCHEMA: &str = r#"{
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
                {"name": "name", "type": ["null", "string"], "default": null},
                {"name": "name_isMissing", "type": "boolean"},
                {"name": "amount", "type": ["null", "double"], "default": null},
                {"name": "amount_isMissing", "type": "boolean"}
            ]
        }], "default": null},
        {"name": "after", "type": ["null", "columns"], "default": null}
    ]
}"#;

/// Canonical form of [`ORDERS_SCHEMA`]
pub fn orders_canonical_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "record",
        "name": "columns",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "name", "type": ["null", "string"], "default": null},
            {"name": "amount", "type": ["null", "double"], "default": null}
        ]
    })
}

/// Cache holding the orders schema
pub fn orders_cache() -> SchemaCache {
    SchemaCache::from_documents([(SchemaFingerprint::new(ORDERS_FINGERPRINT), ORDERS_SCHEMA)])
}

/// Column values of one orders image; `None` means not captured.
#[derive(Debug, Clone, Default)]
pub struct OrdersImage {
    pub id: i64,
    pub name: Option<Option<String>>,
    pub amount: Option<Option<f64>>,
}

impl OrdersImage {
    fn to_avro(&self) -> Value {
        let name = self.name.clone().flatten();
        let amount = self.amount.flatten();
        Value::Record(vec![
            ("id".to_string(), Value::Long(self.id)),
            (
                "name".to_string(),
                match name {
                    Some(name) => Value::Union(1, Box::new(Value::String(name))),
                    None => Value::Union(0, Box::new(Value::Null)),
                },
            ),
            (
                "name_isMissing".to_string(),
                Value::Boolean(self.name.is_none()),
            ),
            (
                "amount".to_string(),
                match amount {
                    Some(amount) => Value::Union(1, Box::new(Value::Double(amount))),
                    None => Value::Union(0, Box::new(Value::Null)),
                },
            ),
            (
                "amount_isMissing".to_string(),
                Value::Boolean(self.amount.is_none()),
            ),
        ])
    }
}

fn optional_image(image: Option<&OrdersImage>) -> Value {
    match image {
        Some(image) => Value::Union(1, Box::new(image.to_avro())),
        None => Value::Union(0, Box::new(Value::Null)),
    }
}

/// Avro-encoded orders row payload
pub fn orders_payload(
    op_type: &str,
    before: Option<&OrdersImage>,
    after: Option<&OrdersImage>,
) -> Vec<u8> {
    let schema = Schema::parse_str(ORDERS_SCHEMA).unwrap();
    let row = Value::Record(vec![
        ("table".to_string(), Value::String("SALES.ORDERS".to_string())),
        ("op_type".to_string(), Value::String(op_type.to_string())),
        (
            "primary_keys".to_string(),
            Value::Array(vec![Value::String("id".to_string())]),
        ),
        ("before".to_string(), optional_image(before)),
        ("after".to_string(), optional_image(after)),
    ]);
    apache_avro::to_avro_datum(&schema, row).unwrap()
}

/// Generic wrapper around an orders payload
pub fn orders_wrapper(fingerprint: i64, payload: Vec<u8>) -> Vec<u8> {
    WrappedChangeEnvelope {
        table_name: "SALES.ORDERS".to_string(),
        schema_fingerprint: SchemaFingerprint::new(fingerprint),
        payload,
    }
    .encode()
    .unwrap()
}

/// Data record as delivered on the `message` field
pub fn data_record(bytes: Vec<u8>) -> InboundRecord {
    InboundRecord::new(Some("SALES.ORDERS")).with_field("message", bytes)
}

/// DDL record carrying a schema document
pub fn ddl_record(document: &str) -> InboundRecord {
    InboundRecord::new(Some(DDL_RECORD_NAME)).with_field("message", document.as_bytes().to_vec())
}

/// Session marker record
pub fn marker_record() -> InboundRecord {
    InboundRecord::new(Some(GENERIC_WRAPPER_RECORD_NAME)).with_field("message", Vec::new())
}
