use crate::error::DbError;
use crate::udbc::deserializer::{RowDeserializer, ValueDeserializer};
use crate::udbc::value::Value;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// One result row, copied out of the driver.
///
/// Column names are shared between every row of a result set; values are
/// owned, so a row stays valid after the cursor that produced it advances.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Pairs column names with values positionally; a column without a value
    /// reads as absent.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of the first column named `column`.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Decodes one column into `T`.
    pub fn get<T: DeserializeOwned>(&self, column: &str) -> Result<T, DbError> {
        let value = self
            .value(column)
            .ok_or_else(|| DbError::Value(format!("no column named '{}'", column)))?;
        T::deserialize(ValueDeserializer { value })
            .map_err(|e| DbError::Value(format!("column '{}': {}", column, e)))
    }

    /// Decodes the whole row into `T`, matching fields by column name.
    pub fn to<T: DeserializeOwned>(&self) -> Result<T, DbError> {
        T::deserialize(RowDeserializer::new(self))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        self.columns.iter().cloned().zip(self.values).collect()
    }
}
