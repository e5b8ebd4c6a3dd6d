//! Value -> JSON conversion for CLI output

use serde_json::{Map, Value as JsonValue, json};

use crate::{CompiledQuery, Value};

/// Convert a bound parameter value to serde_json::Value
///
/// Decimals are written as strings so no precision is lost.
pub fn value_to_json(v: &Value) -> JsonValue {
    match v {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Decimal(d) => JsonValue::String(d.to_string()),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Char(c) => JsonValue::String(c.to_string()),
        Value::List(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
    }
}

/// Convert a compiled query to the JSON document the CLI prints
pub fn compiled_to_json(query: &CompiledQuery) -> JsonValue {
    let parameters: Map<String, JsonValue> = query
        .parameters
        .iter()
        .map(|(name, value)| (name.to_string(), value_to_json(value)))
        .collect();

    json!({
        "select": query.rows.text,
        "count": query.count.text,
        "parameters": parameters,
        "maxRows": query.rows.max_rows,
        "firstRow": query.rows.first_row,
    })
}
