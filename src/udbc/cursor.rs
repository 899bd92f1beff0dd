use crate::error::DbError;
use crate::udbc::connection::RowStream;
use crate::udbc::row::Row;
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Forward-only, single-pass sequence of query results.
///
/// Each step decodes the next server row into an owned `T`. Dropping the
/// cursor before it is exhausted discards the remaining rows.
pub struct Cursor<T> {
    rows: RowStream,
    decode: fn(Row) -> Result<T, DbError>,
}

impl<T> Cursor<T> {
    pub fn new(rows: RowStream, decode: fn(Row) -> Result<T, DbError>) -> Self {
        Self { rows, decode }
    }

    /// Next decoded row, or `None` once the result set is exhausted.
    pub async fn next(&mut self) -> Option<Result<T, DbError>> {
        StreamExt::next(self).await
    }

    /// Drains the cursor into a `Vec`, stopping at the first error.
    pub async fn try_collect(mut self) -> Result<Vec<T>, DbError> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await {
            out.push(item?);
        }
        Ok(out)
    }
}

impl Cursor<Row> {
    pub fn rows(rows: RowStream) -> Self {
        Self::new(rows, Ok)
    }
}

impl<T> Stream for Cursor<T> {
    type Item = Result<T, DbError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let decode = self.decode;
        self.rows
            .poll_next_unpin(cx)
            .map(|item| item.map(|row| row.and_then(decode)))
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::udbc::value::Value;
    use futures::stream;
    use std::sync::Arc;

    fn rows(names: &[&str]) -> RowStream {
        let columns: Arc<[String]> = Arc::from(vec!["city".to_string()]);
        let rows: Vec<Result<Row, DbError>> = names
            .iter()
            .map(|n| Ok(Row::new(columns.clone(), vec![Value::Str(n.to_string())])))
            .collect();
        stream::iter(rows).boxed()
    }

    #[tokio::test]
    async fn test_cursor_decodes_each_row() {
        let cursor = Cursor::new(rows(&["Pittsburgh", "Mt. Lebanon"]), |row| row.get("city"));
        let cities: Vec<String> = cursor.try_collect().await.unwrap();
        assert_eq!(cities, vec!["Pittsburgh", "Mt. Lebanon"]);
    }

    #[tokio::test]
    async fn test_cursor_is_single_pass() {
        let mut cursor = Cursor::rows(rows(&["Pittsburgh"]));
        assert!(cursor.next().await.is_some());
        assert!(cursor.next().await.is_none());
        assert!(cursor.next().await.is_none());
    }

    #[tokio::test]
    async fn test_decode_error_is_yielded_not_panicked() {
        let mut cursor = Cursor::new(rows(&["Pittsburgh"]), |row| row.get::<i32>("city"));
        assert!(matches!(cursor.next().await, Some(Err(DbError::Value(_)))));
    }
}
