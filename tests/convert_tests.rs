// tests/convert_tests.rs

use mql_lang::{JsonTypeConverter, MqlError, TypeConverter, Value, ValueType};
use rust_decimal::Decimal;
use serde_json::json;

fn convert(raw: serde_json::Value, target: ValueType) -> Result<Value, MqlError> {
    JsonTypeConverter::new().convert(&raw, &target)
}

// ============================================================================
// Accepted conversions
// ============================================================================

#[test]
fn test_null_converts_to_null() {
    for target in [ValueType::Integer, ValueType::String, ValueType::Boolean] {
        assert_eq!(convert(json!(null), target).unwrap(), Value::Null);
    }
}

#[test]
fn test_boolean() {
    assert_eq!(convert(json!(true), ValueType::Boolean).unwrap(), Value::Boolean(true));
    assert_eq!(convert(json!("false"), ValueType::Boolean).unwrap(), Value::Boolean(false));
}

#[test]
fn test_integer() {
    assert_eq!(convert(json!(42), ValueType::Integer).unwrap(), Value::Integer(42));
    assert_eq!(convert(json!(-7), ValueType::Integer).unwrap(), Value::Integer(-7));
    assert_eq!(convert(json!(3.0), ValueType::Integer).unwrap(), Value::Integer(3));
    assert_eq!(convert(json!(" 12 "), ValueType::Integer).unwrap(), Value::Integer(12));
}

#[test]
fn test_float() {
    assert_eq!(convert(json!(1.5), ValueType::Float).unwrap(), Value::Float(1.5));
    assert_eq!(convert(json!(2), ValueType::Float).unwrap(), Value::Float(2.0));
    assert_eq!(convert(json!("0.25"), ValueType::Float).unwrap(), Value::Float(0.25));
}

#[test]
fn test_decimal() {
    assert_eq!(
        convert(json!("19.99"), ValueType::Decimal).unwrap(),
        Value::Decimal(Decimal::new(1999, 2))
    );
    assert_eq!(
        convert(json!(7), ValueType::Decimal).unwrap(),
        Value::Decimal(Decimal::new(7, 0))
    );
    assert_eq!(
        convert(json!("1e3"), ValueType::Decimal).unwrap(),
        Value::Decimal(Decimal::new(1000, 0))
    );
}

#[test]
fn test_string() {
    assert_eq!(convert(json!("x"), ValueType::String).unwrap(), Value::String("x".into()));
    assert_eq!(convert(json!(5), ValueType::String).unwrap(), Value::String("5".into()));
    assert_eq!(convert(json!(true), ValueType::String).unwrap(), Value::String("true".into()));
}

#[test]
fn test_char() {
    assert_eq!(convert(json!("é"), ValueType::Char).unwrap(), Value::Char('é'));
}

#[test]
fn test_convert_list() {
    let converter = JsonTypeConverter::new();
    let items = converter
        .convert_list(&[json!(1), json!("2"), json!(null)], &ValueType::Integer)
        .unwrap();
    assert_eq!(items, vec![Value::Integer(1), Value::Integer(2), Value::Null]);
}

// ============================================================================
// Rejected conversions
// ============================================================================

#[test]
fn test_rejections_are_conversion_errors() {
    let cases = [
        (json!("yes"), ValueType::Boolean),
        (json!(1), ValueType::Boolean),
        (json!(1.5), ValueType::Integer),
        (json!(1e19), ValueType::Integer),
        (json!("1.5"), ValueType::Integer),
        (json!("abc"), ValueType::Float),
        (json!("abc"), ValueType::Decimal),
        (json!([1]), ValueType::String),
        (json!({"a": 1}), ValueType::String),
        (json!(""), ValueType::Char),
        (json!("ab"), ValueType::Char),
        (json!(1), ValueType::Entity("Employee".into())),
    ];

    for (raw, target) in cases {
        let result = convert(raw.clone(), target.clone());
        assert!(
            matches!(result, Err(MqlError::Conversion(_))),
            "expected conversion error for {} as {}",
            raw,
            target.name()
        );
    }
}

#[test]
fn test_convert_list_stops_at_first_error() {
    let converter = JsonTypeConverter::new();
    let result = converter.convert_list(&[json!(1), json!("x")], &ValueType::Integer);
    assert!(matches!(result, Err(MqlError::Conversion(_))));
}

// ============================================================================
// Values
// ============================================================================

#[test]
fn test_value_display() {
    assert_eq!(Value::Null.to_string(), "NULL");
    assert_eq!(Value::String("a".into()).to_string(), "\"a\"");
    assert_eq!(Value::Char('x').to_string(), "'x'");
    assert_eq!(
        Value::List(vec![Value::Integer(1), Value::Boolean(false)]).to_string(),
        "[1, false]"
    );
}

#[test]
fn test_value_accessors() {
    assert!(Value::Null.is_null());
    assert_eq!(Value::Integer(3).as_int(), Some(3));
    assert_eq!(Value::String("s".into()).as_str(), Some("s"));
    assert_eq!(Value::List(vec![]).as_list(), Some(&[][..]));
    assert_eq!(Value::Decimal(Decimal::ONE).type_name(), "decimal");
}
