use crate::error::DbError;
use crate::executor::registry::Statement;
use crate::mapper_loader::StatementKind;
use crate::udbc::connection::Connection;
use crate::udbc::cursor::Cursor;
use crate::udbc::row::Row;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

/// Binds arguments to prepared statements and runs them on one connection.
pub struct Session<'a, C: Connection> {
    conn: &'a C,
}

impl<'a, C: Connection> Session<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Runs an insert, update or delete and returns the affected row count.
    pub async fn execute<T>(&self, stmt: &Statement<C::Statement>, args: &T) -> Result<u64, DbError>
    where
        T: Serialize + ?Sized,
    {
        if stmt.kind == StatementKind::Select {
            return Err(kind_mismatch(stmt, "execute"));
        }
        let params = stmt.template.bind(args)?;
        let param_count = params.len();
        let start = Instant::now();
        let result = self.conn.execute(&stmt.handle, params).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let affected = result.as_ref().ok().copied();
        let err = result.as_ref().err().map(|e| e.to_string());
        debug!(id = stmt.id(), param_count, elapsed_ms, ?affected, ?err, "execute");
        result
    }

    /// Runs a read and returns a cursor decoding each row with `decode`.
    ///
    /// The elapsed time covers the round trip up to the first response; rows
    /// are fetched as the cursor is consumed.
    pub async fn query<T, R>(
        &self,
        stmt: &Statement<C::Statement>,
        args: &T,
        decode: fn(Row) -> Result<R, DbError>,
    ) -> Result<Cursor<R>, DbError>
    where
        T: Serialize + ?Sized,
    {
        if stmt.kind != StatementKind::Select {
            return Err(kind_mismatch(stmt, "query"));
        }
        let params = stmt.template.bind(args)?;
        let param_count = params.len();
        let start = Instant::now();
        let result = self.conn.query(&stmt.handle, params).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let err = result.as_ref().err().map(|e| e.to_string());
        debug!(id = stmt.id(), param_count, elapsed_ms, ?err, "query");
        Ok(Cursor::new(result?, decode))
    }
}

fn kind_mismatch<S>(stmt: &Statement<S>, call: &str) -> DbError {
    DbError::Bind(format!(
        "statement '{}' is declared as {:?} and cannot be run with {}",
        stmt.id(),
        stmt.kind,
        call
    ))
}
