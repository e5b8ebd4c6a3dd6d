use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::{error::MqlError, schema::ValueType, value::Value};

/// Converts decoded literals into the declared type of the attribute they
/// are compared with.
pub trait TypeConverter {
    fn convert(&self, raw: &JsonValue, target: &ValueType) -> Result<Value, MqlError>;

    fn convert_list(&self, raw: &[JsonValue], element: &ValueType) -> Result<Vec<Value>, MqlError> {
        raw.iter().map(|item| self.convert(item, element)).collect()
    }
}

/// Default converter for JSON-decoded literals.
///
/// Numbers and booleans written as strings are accepted (`"42"` converts to
/// an integer attribute), as are numbers and booleans where a string is
/// expected. Fractional values never convert to integers, and relations
/// never convert at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTypeConverter;

impl JsonTypeConverter {
    pub fn new() -> Self {
        JsonTypeConverter
    }
}

fn mismatch(raw: &JsonValue, target: &ValueType) -> MqlError {
    MqlError::conversion(format!("Cannot convert {} to {}", raw, target.name()))
}

fn f64_to_i64(f: f64) -> Option<i64> {
    // 2^63 is the first f64 past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

impl TypeConverter for JsonTypeConverter {
    fn convert(&self, raw: &JsonValue, target: &ValueType) -> Result<Value, MqlError> {
        let converted = match (target, raw) {
            (_, JsonValue::Null) => Some(Value::Null),

            (ValueType::Boolean, JsonValue::Bool(b)) => Some(Value::Boolean(*b)),
            (ValueType::Boolean, JsonValue::String(s)) => match s.trim() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },

            (ValueType::Integer, JsonValue::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(f64_to_i64))
                .map(Value::Integer),
            (ValueType::Integer, JsonValue::String(s)) => {
                s.trim().parse::<i64>().ok().map(Value::Integer)
            }

            (ValueType::Float, JsonValue::Number(n)) => n.as_f64().map(Value::Float),
            (ValueType::Float, JsonValue::String(s)) => s.trim().parse::<f64>().ok().map(Value::Float),

            (ValueType::Decimal, JsonValue::Number(n)) => parse_decimal(&n.to_string()).map(Value::Decimal),
            (ValueType::Decimal, JsonValue::String(s)) => parse_decimal(s).map(Value::Decimal),

            (ValueType::String, JsonValue::String(s)) => Some(Value::String(s.clone())),
            (ValueType::String, JsonValue::Number(n)) => Some(Value::String(n.to_string())),
            (ValueType::String, JsonValue::Bool(b)) => Some(Value::String(b.to_string())),

            (ValueType::Char, JsonValue::String(s)) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::Char(c)),
                    _ => None,
                }
            }

            (ValueType::Entity(name), _) => {
                return Err(MqlError::conversion(format!(
                    "Cannot compare relation to {} with literal {}",
                    name, raw
                )));
            }

            _ => None,
        };

        converted.ok_or_else(|| mismatch(raw, target))
    }
}
