//! Helpers for walking decoded Avro values

use apache_avro::types::Value as AvroValue;
use base64::Engine;
use serde_json::Value as JsonValue;

use crate::common::{CdcError, Result};

/// Strip union wrappers, returning the selected branch.
pub(crate) fn unwrap_union(value: AvroValue) -> AvroValue {
    match value {
        AvroValue::Union(_, inner) => unwrap_union(*inner),
        other => other,
    }
}

/// Borrowing variant of [`unwrap_union`].
pub(crate) fn unwrap_union_ref(value: &AvroValue) -> &AvroValue {
    match value {
        AvroValue::Union(_, inner) => unwrap_union_ref(inner),
        other => other,
    }
}

/// Fields of a decoded record, in schema order.
pub(crate) fn into_record(value: AvroValue, what: &str) -> Result<Vec<(String, AvroValue)>> {
    match unwrap_union(value) {
        AvroValue::Record(fields) => Ok(fields),
        other => Err(CdcError::serialization(format!(
            "expected {} to be a record, got {:?}",
            what, other
        ))),
    }
}

/// Remove and return the named field.
pub(crate) fn take_field(
    fields: &mut Vec<(String, AvroValue)>,
    name: &str,
) -> Option<AvroValue> {
    let idx = fields.iter().position(|(n, _)| n == name)?;
    Some(fields.swap_remove(idx).1)
}

/// Remove the named field and require it to be a string.
pub(crate) fn take_string(fields: &mut Vec<(String, AvroValue)>, name: &str) -> Result<String> {
    match take_field(fields, name).map(unwrap_union) {
        Some(AvroValue::String(s)) | Some(AvroValue::Enum(_, s)) => Ok(s),
        Some(other) => Err(CdcError::serialization(format!(
            "field '{}' is not a string: {:?}",
            name, other
        ))),
        None => Err(CdcError::serialization(format!(
            "required field '{}' is missing",
            name
        ))),
    }
}

/// Remove the named field and require it to be a long.
pub(crate) fn take_long(fields: &mut Vec<(String, AvroValue)>, name: &str) -> Result<i64> {
    match take_field(fields, name).map(unwrap_union) {
        Some(AvroValue::Long(v)) => Ok(v),
        Some(AvroValue::Int(v)) => Ok(i64::from(v)),
        Some(other) => Err(CdcError::serialization(format!(
            "field '{}' is not a long: {:?}",
            name, other
        ))),
        None => Err(CdcError::serialization(format!(
            "required field '{}' is missing",
            name
        ))),
    }
}

/// Remove the named field and require it to be bytes (or fixed).
pub(crate) fn take_bytes(fields: &mut Vec<(String, AvroValue)>, name: &str) -> Result<Vec<u8>> {
    match take_field(fields, name).map(unwrap_union) {
        Some(AvroValue::Bytes(b)) | Some(AvroValue::Fixed(_, b)) => Ok(b),
        Some(other) => Err(CdcError::serialization(format!(
            "field '{}' is not bytes: {:?}",
            name, other
        ))),
        None => Err(CdcError::serialization(format!(
            "required field '{}' is missing",
            name
        ))),
    }
}

/// Remove the named field and require it to be an array of strings.
pub(crate) fn take_string_array(
    fields: &mut Vec<(String, AvroValue)>,
    name: &str,
) -> Result<Vec<String>> {
    match take_field(fields, name).map(unwrap_union) {
        Some(AvroValue::Array(items)) => items
            .into_iter()
            .map(|item| match unwrap_union(item) {
                AvroValue::String(s) => Ok(s),
                other => Err(CdcError::serialization(format!(
                    "field '{}' contains a non-string item: {:?}",
                    name, other
                ))),
            })
            .collect(),
        Some(AvroValue::Null) | None => Ok(Vec::new()),
        Some(other) => Err(CdcError::serialization(format!(
            "field '{}' is not an array: {:?}",
            name, other
        ))),
    }
}

/// Convert a decoded Avro value to JSON.
///
/// Unions collapse to their branch, bytes and fixed render as base64.
/// Decimals render as strings of their unscaled value; use
/// [`column_to_json`] when the declared scale is known.
pub fn avro_to_json(avro: &AvroValue) -> Result<JsonValue> {
    match avro {
        AvroValue::Null => Ok(JsonValue::Null),
        AvroValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
        AvroValue::Int(i) => Ok(JsonValue::Number((*i).into())),
        AvroValue::Long(l) => Ok(JsonValue::Number((*l).into())),
        AvroValue::Float(f) => Ok(serde_json::json!(*f)),
        AvroValue::Double(d) => Ok(serde_json::json!(*d)),
        AvroValue::String(s) => Ok(JsonValue::String(s.clone())),
        AvroValue::Bytes(b) | AvroValue::Fixed(_, b) => Ok(JsonValue::String(
            base64::engine::general_purpose::STANDARD.encode(b),
        )),
        AvroValue::Array(arr) => {
            let items: Result<Vec<_>> = arr.iter().map(avro_to_json).collect();
            Ok(JsonValue::Array(items?))
        }
        AvroValue::Map(map) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in map {
                obj.insert(k.clone(), avro_to_json(v)?);
            }
            Ok(JsonValue::Object(obj))
        }
        AvroValue::Union(_idx, inner) => avro_to_json(inner),
        AvroValue::Record(fields) => {
            let mut obj = serde_json::Map::new();
            for (name, value) in fields {
                obj.insert(name.clone(), avro_to_json(value)?);
            }
            Ok(JsonValue::Object(obj))
        }
        AvroValue::Enum(_idx, symbol) => Ok(JsonValue::String(symbol.clone())),
        AvroValue::Date(days) => Ok(JsonValue::Number((*days).into())),
        AvroValue::TimeMillis(v) => Ok(JsonValue::Number((*v).into())),
        AvroValue::TimeMicros(v)
        | AvroValue::TimestampMillis(v)
        | AvroValue::TimestampMicros(v)
        | AvroValue::LocalTimestampMillis(v)
        | AvroValue::LocalTimestampMicros(v) => Ok(JsonValue::Number((*v).into())),
        AvroValue::TimestampNanos(v) | AvroValue::LocalTimestampNanos(v) => {
            Ok(JsonValue::Number((*v).into()))
        }
        AvroValue::Decimal(decimal) => decimal_to_json(decimal, 0),
        AvroValue::BigDecimal(decimal) => Ok(JsonValue::String(decimal.to_string())),
        AvroValue::Duration(duration) => Ok(serde_json::json!({
            "months": u32::from(duration.months()),
            "days": u32::from(duration.days()),
            "millis": u32::from(duration.millis()),
        })),
        AvroValue::Uuid(u) => Ok(JsonValue::String(u.to_string())),
        _ => Err(CdcError::serialization(format!(
            "Unsupported Avro value: {:?}",
            avro
        ))),
    }
}

/// Convert a column value, applying the scale declared by its field type.
pub fn column_to_json(avro: &AvroValue, field_type: &JsonValue) -> Result<JsonValue> {
    match unwrap_union_ref(avro) {
        AvroValue::Decimal(decimal) => decimal_to_json(decimal, decimal_scale(field_type)),
        other => avro_to_json(other),
    }
}

/// Scale of the `decimal` logical type, looking through unions.
fn decimal_scale(field_type: &JsonValue) -> u32 {
    match field_type {
        JsonValue::Object(obj)
            if obj.get("logicalType").and_then(JsonValue::as_str) == Some("decimal") =>
        {
            obj.get("scale")
                .and_then(JsonValue::as_u64)
                .and_then(|scale| u32::try_from(scale).ok())
                .unwrap_or(0)
        }
        JsonValue::Object(obj) => obj.get("type").map(decimal_scale).unwrap_or(0),
        JsonValue::Array(branches) => branches.iter().map(decimal_scale).max().unwrap_or(0),
        _ => 0,
    }
}

/// Render a two's-complement decimal as a plain decimal string.
fn decimal_to_json(decimal: &apache_avro::Decimal, scale: u32) -> Result<JsonValue> {
    let bytes = Vec::<u8>::try_from(decimal)?;
    if bytes.len() > 16 {
        return Err(CdcError::serialization(format!(
            "decimal of {} bytes exceeds 128 bits",
            bytes.len()
        )));
    }
    let fill = if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        0xff
    } else {
        0x00
    };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(&bytes);
    let unscaled = i128::from_be_bytes(buf);

    let digits = unscaled.unsigned_abs().to_string();
    let sign = if unscaled < 0 { "-" } else { "" };
    let scale = scale as usize;
    let rendered = if scale == 0 {
        format!("{}{}", sign, digits)
    } else {
        let digits = format!("{:0>width$}", digits, width = scale + 1);
        let (int, frac) = digits.split_at(digits.len() - scale);
        format!("{}{}.{}", sign, int, frac)
    };
    Ok(JsonValue::String(rendered))
}
