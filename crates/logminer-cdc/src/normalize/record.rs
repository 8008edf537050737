//! Canonical output records
//!
//! Every processed input yields at most one [`CanonicalRecord`]: a DDL record
//! carrying the canonical column schema of a table, or a DML record carrying
//! one row change shaped by that schema.

use apache_avro::types::Value as AvroValue;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::avro::column_to_json;
use super::normalizer::OpType;
use crate::common::Result;

/// Schema change of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlRecord {
    /// `NAMESPACE_NAME` of the table
    pub table: String,
    /// Canonical `columns` schema, serialized
    pub schema: String,
}

/// One column value of a change set, with its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeField {
    /// Column name
    pub name: String,
    /// Avro type from the canonical schema, as JSON
    pub field_type: JsonValue,
    /// Captured value
    pub value: AvroValue,
}

/// The selected columns of a row change, in schema order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeRecord {
    fields: Vec<ChangeField>,
}

impl ChangeRecord {
    /// Create from fields
    pub fn new(fields: Vec<ChangeField>) -> Self {
        Self { fields }
    }

    /// Append a field
    pub fn push(&mut self, field: ChangeField) {
        self.fields.push(field);
    }

    /// Field by column name
    pub fn get(&self, name: &str) -> Option<&ChangeField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Column names in order
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Iterate fields
    pub fn iter(&self) -> impl Iterator<Item = &ChangeField> {
        self.fields.iter()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no column was selected
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Record schema describing exactly these columns.
    pub fn schema_json(&self) -> JsonValue {
        serde_json::json!({
            "type": "record",
            "name": "change",
            "fields": self
                .fields
                .iter()
                .map(|f| serde_json::json!({"name": f.name, "type": f.field_type}))
                .collect::<Vec<_>>(),
        })
    }

    /// Column values as a JSON object.
    pub fn to_json(&self) -> Result<JsonValue> {
        let mut obj = serde_json::Map::with_capacity(self.fields.len());
        for field in &self.fields {
            obj.insert(field.name.clone(), column_to_json(&field.value, &field.field_type)?);
        }
        Ok(JsonValue::Object(obj))
    }
}

/// One row change of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct DmlRecord {
    /// Table name with `.` flattened to `_`
    pub table: String,
    /// Canonical `columns` schema, serialized
    pub schema: String,
    /// Raw op type
    pub op_type: String,
    /// Primary key column names
    pub primary_keys: Vec<String>,
    /// Selected columns
    pub change: ChangeRecord,
}

impl DmlRecord {
    /// Parsed op type
    pub fn op(&self) -> OpType {
        OpType::parse(&self.op_type)
    }

    /// JSON rendering of the record.
    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::json!({
            "table": self.table,
            "schema": self.schema,
            "op_type": self.op_type,
            "primary_keys": self.primary_keys,
            "change": self.change.to_json()?,
        }))
    }
}

/// Output of the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalRecord {
    /// Schema change
    Ddl(DdlRecord),
    /// Row change
    Dml(DmlRecord),
}

impl CanonicalRecord {
    /// Table the record belongs to
    pub fn table(&self) -> &str {
        match self {
            Self::Ddl(ddl) => &ddl.table,
            Self::Dml(dml) => &dml.table,
        }
    }

    /// Canonical schema document
    pub fn schema(&self) -> &str {
        match self {
            Self::Ddl(ddl) => &ddl.schema,
            Self::Dml(dml) => &dml.schema,
        }
    }

    /// `"ddl"` or `"dml"`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ddl(_) => "ddl",
            Self::Dml(_) => "dml",
        }
    }

    /// JSON rendering, tagged with `kind`.
    pub fn to_json(&self) -> Result<JsonValue> {
        let mut json = match self {
            Self::Ddl(ddl) => serde_json::to_value(ddl)?,
            Self::Dml(dml) => dml.to_json()?,
        };
        if let JsonValue::Object(obj) = &mut json {
            obj.insert("kind".to_string(), JsonValue::from(self.kind()));
        }
        Ok(json)
    }
}
