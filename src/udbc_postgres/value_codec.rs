use crate::error::DbError;
use crate::udbc::row::Row;
use crate::udbc::value::{Value, ValueType};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use std::sync::Arc;
use tokio_postgres::Row as PgRow;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use tracing::warn;

/// Declared parameter type to the PostgreSQL wire type used when preparing.
pub fn pg_type(ty: &ValueType) -> Type {
    match ty {
        ValueType::Varchar => Type::VARCHAR,
        ValueType::Text => Type::TEXT,
        ValueType::SmallInt => Type::INT2,
        ValueType::Integer => Type::INT4,
        ValueType::BigInt => Type::INT8,
        ValueType::Boolean => Type::BOOL,
        ValueType::Double => Type::FLOAT8,
        ValueType::Numeric => Type::NUMERIC,
        ValueType::Date => Type::DATE,
        ValueType::Timestamp => Type::TIMESTAMP,
        ValueType::TimestampTz => Type::TIMESTAMPTZ,
        ValueType::Array(element) => match element.as_ref() {
            ValueType::Varchar => Type::VARCHAR_ARRAY,
            ValueType::Text => Type::TEXT_ARRAY,
            ValueType::SmallInt => Type::INT2_ARRAY,
            ValueType::Integer => Type::INT4_ARRAY,
            ValueType::BigInt => Type::INT8_ARRAY,
            ValueType::Boolean => Type::BOOL_ARRAY,
            ValueType::Double => Type::FLOAT8_ARRAY,
            ValueType::Numeric => Type::NUMERIC_ARRAY,
            ValueType::Date => Type::DATE_ARRAY,
            ValueType::Timestamp => Type::TIMESTAMP_ARRAY,
            ValueType::TimestampTz => Type::TIMESTAMPTZ_ARRAY,
            ValueType::Array(_) => Type::UNKNOWN,
        },
    }
}

// Values reach the driver already coerced to their declared type, so the
// variant decides the encoding and `accepts` does not second-guess it.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::I16(v) => v.to_sql(ty, out),
            Value::I32(v) => v.to_sql(ty, out),
            Value::I64(v) => v.to_sql(ty, out),
            Value::F32(v) => v.to_sql(ty, out),
            Value::F64(v) => v.to_sql(ty, out),
            Value::Str(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Time(v) => v.to_sql(ty, out),
            Value::DateTime(v) => v.to_sql(ty, out),
            Value::DateTimeUtc(v) => v.to_sql(ty, out),
            Value::Decimal(v) => v.to_sql(ty, out),
            Value::List(items) => match ty.kind() {
                Kind::Array(_) => items.to_sql(ty, out),
                _ => Err(format!("a list cannot be bound to {}", ty).into()),
            },
            Value::Map(_) => Err("a map cannot be bound as a statement parameter".into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn decode<'a, T>(row: &'a PgRow, idx: usize, wrap: fn(T) -> Value) -> Result<Value, DbError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    let v: Option<T> = row
        .try_get(idx)
        .map_err(|e| DbError::Value(format!("column {}: {}", idx, e)))?;
    Ok(v.map(wrap).unwrap_or(Value::Null))
}

fn decode_array<'a, T>(row: &'a PgRow, idx: usize, wrap: fn(T) -> Value) -> Result<Value, DbError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    let v: Option<Vec<Option<T>>> = row
        .try_get(idx)
        .map_err(|e| DbError::Value(format!("column {}: {}", idx, e)))?;
    Ok(v.map(|items| {
        Value::List(
            items
                .into_iter()
                .map(|item| item.map(wrap).unwrap_or(Value::Null))
                .collect(),
        )
    })
    .unwrap_or(Value::Null))
}

fn from_pg_column(row: &PgRow, idx: usize, ty: &Type) -> Result<Value, DbError> {
    match *ty {
        Type::BOOL => decode::<bool>(row, idx, Value::Bool),
        Type::INT2 => decode::<i16>(row, idx, Value::I16),
        Type::INT4 => decode::<i32>(row, idx, Value::I32),
        Type::INT8 => decode::<i64>(row, idx, Value::I64),
        Type::FLOAT4 => decode::<f32>(row, idx, Value::F32),
        Type::FLOAT8 => decode::<f64>(row, idx, Value::F64),
        Type::NUMERIC => decode::<Decimal>(row, idx, Value::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            decode::<String>(row, idx, Value::Str)
        }
        Type::BYTEA => decode::<Vec<u8>>(row, idx, Value::Bytes),
        Type::DATE => decode::<NaiveDate>(row, idx, Value::Date),
        Type::TIME => decode::<NaiveTime>(row, idx, Value::Time),
        Type::TIMESTAMP => decode::<NaiveDateTime>(row, idx, Value::DateTime),
        Type::TIMESTAMPTZ => decode::<DateTime<Utc>>(row, idx, Value::DateTimeUtc),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY => {
            decode_array::<String>(row, idx, Value::Str)
        }
        Type::INT4_ARRAY => decode_array::<i32>(row, idx, Value::I32),
        Type::INT8_ARRAY => decode_array::<i64>(row, idx, Value::I64),
        _ => {
            warn!(column = row.columns()[idx].name(), pg_type = %ty, "unsupported column type, decoded as NULL");
            Ok(Value::Null)
        }
    }
}

/// Copies a driver row into an owned [`Row`] sharing `columns`.
pub fn from_pg_row(row: &PgRow, columns: &Arc<[String]>) -> Result<Row, DbError> {
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| from_pg_column(row, idx, col.type_()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(columns.clone(), values))
}
