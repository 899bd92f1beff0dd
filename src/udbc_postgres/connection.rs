use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, Statement};
use tracing::{error, info};

use crate::error::DbError;
use crate::models::db_config::ConnectOptions;
use crate::udbc::connection::{Connection, RowStream};
use crate::udbc::value::{Value, ValueType};
use crate::udbc_postgres::value_codec::{from_pg_row, pg_type};

/// One plain-text connection to a PostgreSQL server.
///
/// The protocol half of the connection runs on its own tokio task and ends
/// when the client is dropped or the server goes away.
pub struct PgConnection {
    client: Client,
    task: JoinHandle<()>,
}

impl PgConnection {
    pub async fn connect(options: &ConnectOptions) -> Result<Self, DbError> {
        let (client, connection) = options
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "postgres connection terminated");
            }
        });

        info!(host = %options.host, database = %options.database, user = %options.user, "connected");
        Ok(Self { client, task })
    }
}

#[async_trait]
impl Connection for PgConnection {
    type Statement = Statement;

    async fn prepare(&self, sql: &str, types: &[ValueType]) -> Result<Statement, DbError> {
        let types: Vec<_> = types.iter().map(pg_type).collect();
        Ok(self.client.prepare_typed(sql, &types).await?)
    }

    async fn query(&self, stmt: &Statement, params: Vec<Value>) -> Result<RowStream, DbError> {
        let rows = self.client.query_raw(stmt, params).await?;
        let columns: Arc<[String]> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let stream = rows
            .map_err(DbError::from)
            .and_then(move |row| futures::future::ready(from_pg_row(&row, &columns)));
        Ok(stream.boxed())
    }

    async fn execute(&self, stmt: &Statement, params: Vec<Value>) -> Result<u64, DbError> {
        Ok(self.client.execute_raw(stmt, params).await?)
    }

    async fn close(self) -> Result<(), DbError> {
        let PgConnection { client, task } = self;
        drop(client);
        task.await
            .map_err(|e| DbError::Connection(format!("connection task failed: {}", e)))?;
        info!("connection closed");
        Ok(())
    }
}
