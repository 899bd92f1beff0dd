use thiserror::Error;

/// Errors raised by the listings data-access layer.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("General error: {0}")]
    General(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Failed to prepare statement '{id}': {message}")]
    Prepare { id: String, message: String },
    #[error("Query error: {0}")]
    Query(String),
    #[error("Binding error: {0}")]
    Bind(String),
    #[error("Value error: {0}")]
    Value(String),
}

impl DbError {
    pub(crate) fn prepare(id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        DbError::Prepare {
            id: id.into(),
            message: message.to_string(),
        }
    }

    /// True for failures that happen while opening the layer: connecting or preparing.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DbError::Connection(_) | DbError::Prepare { .. })
    }
}

impl serde::de::Error for DbError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        DbError::Value(msg.to_string())
    }
}

impl serde::ser::Error for DbError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        DbError::Bind(msg.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for DbError {
    fn from(e: tokio_postgres::Error) -> Self {
        DbError::Query(e.to_string())
    }
}
