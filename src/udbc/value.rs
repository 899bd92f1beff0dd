use crate::error::DbError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeUtc(DateTime<Utc>),
    Decimal(Decimal),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I16(_) | Value::I32(_) | Value::I64(_) => "integer",
            Value::F32(_) | Value::F64(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) | Value::DateTimeUtc(_) => "timestamp",
            Value::Decimal(_) => "decimal",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }
}

/// Declared type of a template parameter, written `jdbcType=...` in the mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Varchar,
    Text,
    SmallInt,
    Integer,
    BigInt,
    Boolean,
    Double,
    Numeric,
    Date,
    Timestamp,
    TimestampTz,
    Array(Box<ValueType>),
}

impl FromStr for ValueType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(element) = s.strip_suffix("[]") {
            let element: ValueType = element.parse()?;
            if matches!(element, ValueType::Array(_)) {
                return Err(DbError::General(format!("Nested arrays are not supported: {}", s)));
            }
            return Ok(ValueType::Array(Box::new(element)));
        }
        let ty = match s.to_ascii_uppercase().as_str() {
            "VARCHAR" | "CHAR" => ValueType::Varchar,
            "TEXT" | "LONGVARCHAR" => ValueType::Text,
            "SMALLINT" | "TINYINT" => ValueType::SmallInt,
            "INTEGER" | "INT" => ValueType::Integer,
            "BIGINT" => ValueType::BigInt,
            "BOOLEAN" | "BIT" => ValueType::Boolean,
            "DOUBLE" | "FLOAT" => ValueType::Double,
            "NUMERIC" | "DECIMAL" => ValueType::Numeric,
            "DATE" => ValueType::Date,
            "TIMESTAMP" => ValueType::Timestamp,
            "TIMESTAMPTZ" | "TIMESTAMP_WITH_TIMEZONE" => ValueType::TimestampTz,
            other => return Err(DbError::General(format!("Unknown jdbcType: {}", other))),
        };
        Ok(ty)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Varchar => f.write_str("VARCHAR"),
            ValueType::Text => f.write_str("TEXT"),
            ValueType::SmallInt => f.write_str("SMALLINT"),
            ValueType::Integer => f.write_str("INTEGER"),
            ValueType::BigInt => f.write_str("BIGINT"),
            ValueType::Boolean => f.write_str("BOOLEAN"),
            ValueType::Double => f.write_str("DOUBLE"),
            ValueType::Numeric => f.write_str("NUMERIC"),
            ValueType::Date => f.write_str("DATE"),
            ValueType::Timestamp => f.write_str("TIMESTAMP"),
            ValueType::TimestampTz => f.write_str("TIMESTAMPTZ"),
            ValueType::Array(element) => write!(f, "{}[]", element),
        }
    }
}

impl ValueType {
    /// Converts `value` into the variant the driver encodes for this type.
    ///
    /// `NULL` is accepted for every type. Integers are narrowed with range
    /// checks, strings are parsed for temporal and numeric types, and
    /// sequences are coerced element by element for arrays.
    pub fn coerce(&self, value: Value) -> Result<Value, DbError> {
        if value == Value::Null {
            return Ok(value);
        }
        let mismatch = |v: &Value| DbError::Bind(format!("expected {}, got {}", self, v.kind()));
        match self {
            ValueType::Varchar | ValueType::Text => match value {
                Value::Str(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ValueType::SmallInt => {
                let n = value.as_i64().ok_or_else(|| mismatch(&value))?;
                i16::try_from(n)
                    .map(Value::I16)
                    .map_err(|_| DbError::Bind(format!("{} is out of range for SMALLINT", n)))
            }
            ValueType::Integer => {
                let n = value.as_i64().ok_or_else(|| mismatch(&value))?;
                i32::try_from(n)
                    .map(Value::I32)
                    .map_err(|_| DbError::Bind(format!("{} is out of range for INTEGER", n)))
            }
            ValueType::BigInt => value.as_i64().map(Value::I64).ok_or_else(|| mismatch(&value)),
            ValueType::Boolean => match value {
                Value::Bool(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ValueType::Double => match value {
                Value::F64(_) => Ok(value),
                Value::F32(v) => Ok(Value::F64(v as f64)),
                ref v => v.as_i64().map(|n| Value::F64(n as f64)).ok_or_else(|| mismatch(v)),
            },
            ValueType::Numeric => match value {
                Value::Decimal(_) => Ok(value),
                Value::Str(s) => Decimal::from_str(&s)
                    .map(Value::Decimal)
                    .map_err(|e| DbError::Bind(format!("invalid NUMERIC '{}': {}", s, e))),
                ref v => v
                    .as_i64()
                    .map(|n| Value::Decimal(Decimal::from(n)))
                    .ok_or_else(|| mismatch(v)),
            },
            ValueType::Date => match value {
                Value::Date(_) => Ok(value),
                Value::DateTime(dt) => Ok(Value::Date(dt.date())),
                Value::Str(s) => NaiveDate::from_str(&s)
                    .map(Value::Date)
                    .map_err(|e| DbError::Bind(format!("invalid DATE '{}': {}", s, e))),
                other => Err(mismatch(&other)),
            },
            ValueType::Timestamp => match value {
                Value::DateTime(_) => Ok(value),
                Value::DateTimeUtc(dt) => Ok(Value::DateTime(dt.naive_utc())),
                Value::Str(s) => parse_timestamp(&s).map(Value::DateTime),
                other => Err(mismatch(&other)),
            },
            ValueType::TimestampTz => match value {
                Value::DateTimeUtc(_) => Ok(value),
                Value::DateTime(dt) => Ok(Value::DateTimeUtc(dt.and_utc())),
                Value::Str(s) => DateTime::parse_from_rfc3339(&s)
                    .map(|dt| Value::DateTimeUtc(dt.with_timezone(&Utc)))
                    .map_err(|e| DbError::Bind(format!("invalid TIMESTAMPTZ '{}': {}", s, e))),
                other => Err(mismatch(&other)),
            },
            ValueType::Array(element) => match value {
                Value::List(items) => items
                    .into_iter()
                    .map(|item| element.coerce(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List),
                other => Err(mismatch(&other)),
            },
        }
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, DbError> {
    NaiveDateTime::from_str(s)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| DbError::Bind(format!("invalid TIMESTAMP '{}': {}", s, e)))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}
