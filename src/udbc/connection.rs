use crate::error::DbError;
use crate::udbc::row::Row;
use crate::udbc::value::{Value, ValueType};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Rows streamed back from the server, decoded one at a time.
pub type RowStream = BoxStream<'static, Result<Row, DbError>>;

/// A single database connection able to prepare and run typed statements.
///
/// Implementations are not required to support concurrent use; callers issue
/// one statement at a time.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Driver handle of a prepared statement.
    type Statement: Clone + Send + Sync;

    /// Prepares `sql` server-side with the declared parameter types.
    async fn prepare(&self, sql: &str, types: &[ValueType]) -> Result<Self::Statement, DbError>;

    /// Runs a prepared read and streams its rows lazily.
    async fn query(&self, stmt: &Self::Statement, params: Vec<Value>) -> Result<RowStream, DbError>;

    /// Runs a prepared write and returns the number of affected rows.
    async fn execute(&self, stmt: &Self::Statement, params: Vec<Value>) -> Result<u64, DbError>;

    async fn close(self) -> Result<(), DbError>
    where
        Self: Sized;
}
