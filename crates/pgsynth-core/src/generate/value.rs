use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::schema::types::TypeKind;

/// A generated value for a database column.
///
/// Values are handed to the insertion transport as bind parameters, never
/// rendered into SQL text. `Text` also carries catalog values that could not
/// be parsed into their column's kind; the insert placeholder cast turns them
/// into the declared type on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Interpret a textual catalog value (an element of `most_common_vals`)
    /// as a value of the column's kind.
    pub fn from_catalog_text(kind: TypeKind, raw: &str) -> Self {
        match kind {
            TypeKind::Numeric => {
                if let Ok(i) = raw.parse::<i64>() {
                    Value::Int(i)
                } else if let Ok(f) = raw.parse::<f64>() {
                    Value::Float(f)
                } else {
                    Value::Text(raw.to_string())
                }
            }
            TypeKind::Temporal => {
                if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                    Value::Date(d)
                } else if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
                    Value::Timestamp(ts)
                } else {
                    Value::Text(raw.to_string())
                }
            }
            TypeKind::Boolean => match raw {
                "t" | "true" => Value::Bool(true),
                "f" | "false" => Value::Bool(false),
                other => Value::Text(other.to_string()),
            },
            TypeKind::Text | TypeKind::Unsupported => Value::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}
