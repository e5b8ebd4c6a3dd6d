use std::fmt;

use rust_decimal::Decimal;

/// A literal converted to its attribute's declared type, ready to be bound
/// to a query parameter.
///
/// Unlike a decoded JSON literal, a `Value` already carries the target type:
/// integers, floats and decimals are kept apart, and single characters are
/// distinguished from strings.
///
/// # Examples
///
/// ```
/// use mql_lang::Value;
/// use rust_decimal::Decimal;
///
/// let null = Value::Null;
/// let flag = Value::Boolean(true);
/// let age = Value::Integer(42);
/// let ratio = Value::Float(0.5);
/// let price = Value::Decimal(Decimal::new(1999, 2));
/// let name = Value::String("Alice".to_string());
/// let escape = Value::Char('\\');
/// let ids = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
///
/// assert_eq!(price.to_string(), "19.99");
/// assert_eq!(ids.to_string(), "[1, 2]");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,

    Boolean(bool),

    Integer(i64),

    Float(f64),

    /// Exact decimal number
    Decimal(Decimal),

    String(String),

    Char(char),

    /// Element values of an `$in` / `$nin` operand
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Human-readable type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Char(_) => "char",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}
