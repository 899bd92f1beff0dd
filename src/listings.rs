use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::error::DbError;
use crate::executor::registry::StatementRegistry;
use crate::executor::session::Session;
use crate::models::business::Tip;
use crate::udbc::connection::Connection;
use crate::udbc::cursor::Cursor;
use crate::udbc::row::Row;
#[cfg(feature = "postgres")]
use crate::{models::db_config::ConnectOptions, udbc_postgres::PgConnection};

#[derive(Serialize)]
struct StateArgs<'a> {
    state: &'a str,
}

#[derive(Serialize)]
struct CityArgs<'a> {
    state: &'a str,
    city: &'a str,
}

#[derive(Serialize)]
struct ZipArgs {
    zip: i32,
}

#[derive(Serialize)]
struct ZipCategoryArgs<'a> {
    zip: i32,
    categories: Vec<&'a str>,
}

#[derive(Serialize)]
struct TipArgs<'a> {
    user: &'a str,
    business: &'a str,
    date: NaiveDateTime,
    body: &'a str,
}

#[derive(Serialize)]
struct BusinessArgs<'a> {
    business: &'a str,
}

/// Business listings lookups over one connection and its prepared statements.
///
/// Calls are meant to be issued one at a time. Every read returns a
/// single-pass [`Cursor`] that yields owned values; calling a read again
/// runs the statement again.
pub struct Listings<C: Connection> {
    conn: C,
    statements: StatementRegistry<C::Statement>,
}

#[cfg(feature = "postgres")]
impl Listings<PgConnection> {
    /// Connects to the server and prepares every statement.
    pub async fn open(options: &ConnectOptions) -> Result<Self, DbError> {
        let conn = PgConnection::connect(options).await?;
        Self::with_connection(conn).await
    }
}

impl<C: Connection> Listings<C> {
    /// Prepares every statement on an already open connection.
    pub async fn with_connection(conn: C) -> Result<Self, DbError> {
        let statements = StatementRegistry::prepare(&conn).await?;
        Ok(Self { conn, statements })
    }

    pub fn statements(&self) -> &StatementRegistry<C::Statement> {
        &self.statements
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    fn session(&self) -> Session<'_, C> {
        Session::new(&self.conn)
    }

    pub async fn list_states(&self) -> Result<Cursor<String>, DbError> {
        self.session()
            .query(&self.statements.all_states, &(), |row| row.get("business_state"))
            .await
    }

    /// Cities of `state`; an unknown state yields an empty cursor.
    pub async fn list_cities(&self, state: &str) -> Result<Cursor<String>, DbError> {
        self.session()
            .query(&self.statements.cities_in_state, &StateArgs { state }, |row| {
                row.get("city")
            })
            .await
    }

    pub async fn list_zips(&self, state: &str, city: &str) -> Result<Cursor<i32>, DbError> {
        self.session()
            .query(&self.statements.zips_in_city, &CityArgs { state, city }, |row| {
                row.get("zip")
            })
            .await
    }

    /// Businesses in `zip`, restricted to those having at least one of
    /// `categories` when the list is not empty.
    ///
    /// Rows carry every `business` column; decode them with
    /// [`Row::to`] into [`Business`](crate::models::Business) or read single columns.
    pub async fn list_businesses<S>(
        &self,
        zip: i32,
        categories: &[S],
    ) -> Result<Cursor<Row>, DbError>
    where
        S: AsRef<str>,
    {
        match categories {
            [] => {
                self.session()
                    .query(&self.statements.businesses_in_zip, &ZipArgs { zip }, Ok)
                    .await
            }
            _ => {
                let args = ZipCategoryArgs {
                    zip,
                    categories: categories.iter().map(AsRef::as_ref).collect(),
                };
                self.session()
                    .query(&self.statements.businesses_in_zip_with_categories, &args, Ok)
                    .await
            }
        }
    }

    /// Posts a tip and returns the number of rows inserted.
    pub async fn insert_tip(
        &self,
        user: &str,
        business: &str,
        body: &str,
        date: NaiveDateTime,
    ) -> Result<u64, DbError> {
        let args = TipArgs {
            user,
            business,
            date,
            body,
        };
        self.session().execute(&self.statements.insert_tip, &args).await
    }

    /// Tips posted for `business`, newest first.
    pub async fn list_tips(&self, business: &str) -> Result<Cursor<Tip>, DbError> {
        self.session()
            .query(&self.statements.tips_for_business, &BusinessArgs { business }, |row| {
                row.to()
            })
            .await
    }

    /// Releases the connection.
    pub async fn close(self) -> Result<(), DbError> {
        self.conn.close().await?;
        info!("listings closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::business::Business;
    use crate::udbc::connection::RowStream;
    use crate::udbc::value::{Value, ValueType};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use futures::StreamExt;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Records what was prepared and bound, and replays queued result sets.
    #[derive(Default)]
    struct MemoryConnection {
        prepared: Mutex<Vec<(String, Vec<ValueType>)>>,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
        results: Mutex<VecDeque<Vec<Row>>>,
        reject_sql_containing: Option<&'static str>,
    }

    impl MemoryConnection {
        fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
            let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
            let rows = rows
                .into_iter()
                .map(|values| Row::new(columns.clone(), values))
                .collect();
            self.results.lock().unwrap().push_back(rows);
        }

        fn last_call(&self) -> (String, Vec<Value>) {
            self.calls.lock().unwrap().last().cloned().expect("no call recorded")
        }
    }

    #[async_trait]
    impl Connection for MemoryConnection {
        type Statement = usize;

        async fn prepare(&self, sql: &str, types: &[ValueType]) -> Result<usize, DbError> {
            if let Some(needle) = self.reject_sql_containing {
                if sql.contains(needle) {
                    return Err(DbError::Query(format!("relation \"{}\" does not exist", needle)));
                }
            }
            let mut prepared = self.prepared.lock().unwrap();
            prepared.push((sql.to_string(), types.to_vec()));
            Ok(prepared.len() - 1)
        }

        async fn query(&self, stmt: &usize, params: Vec<Value>) -> Result<RowStream, DbError> {
            let sql = self.prepared.lock().unwrap()[*stmt].0.clone();
            self.calls.lock().unwrap().push((sql, params));
            let rows = self.results.lock().unwrap().pop_front().unwrap_or_default();
            Ok(futures::stream::iter(rows.into_iter().map(Ok)).boxed())
        }

        async fn execute(&self, stmt: &usize, params: Vec<Value>) -> Result<u64, DbError> {
            let sql = self.prepared.lock().unwrap()[*stmt].0.clone();
            self.calls.lock().unwrap().push((sql, params));
            Ok(1)
        }

        async fn close(self) -> Result<(), DbError> {
            Ok(())
        }
    }

    async fn listings() -> Listings<MemoryConnection> {
        Listings::with_connection(MemoryConnection::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_prepares_every_statement_with_types() {
        let listings = listings().await;
        let prepared = listings.connection().prepared.lock().unwrap().clone();
        assert_eq!(prepared.len(), 7);

        let (sql, types) = &prepared[4];
        assert!(sql.contains("ANY($2)"), "{}", sql);
        assert_eq!(
            types,
            &vec![
                ValueType::Integer,
                ValueType::Array(Box::new(ValueType::Varchar))
            ]
        );
        assert_eq!(
            listings.statements().insert_tip.template.types(),
            vec![
                ValueType::Varchar,
                ValueType::Varchar,
                ValueType::Timestamp,
                ValueType::Varchar
            ]
        );
    }

    #[tokio::test]
    async fn test_preparation_failure_names_the_statement() {
        let conn = MemoryConnection {
            reject_sql_containing: Some("tip"),
            ..Default::default()
        };
        match Listings::with_connection(conn).await {
            Err(DbError::Prepare { id, .. }) => assert_eq!(id, "insertTip"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected preparation to fail"),
        }
    }

    #[tokio::test]
    async fn test_list_states() {
        let listings = listings().await;
        listings.connection().push_rows(
            &["business_state"],
            vec![vec!["PA".into()], vec!["OH".into()]],
        );
        let states = listings.list_states().await.unwrap().try_collect().await.unwrap();
        assert_eq!(states, vec!["PA", "OH"]);
        let (_, params) = listings.connection().last_call();
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_state_yields_empty_cursor() {
        let listings = listings().await;
        let mut cities = listings.list_cities("ZZ").await.unwrap();
        assert!(cities.next().await.is_none());
        let (sql, params) = listings.connection().last_call();
        assert!(sql.contains("business_state = $1"));
        assert_eq!(params, vec![Value::from("ZZ")]);
    }

    #[tokio::test]
    async fn test_list_zips_binds_state_then_city() {
        let listings = listings().await;
        listings
            .connection()
            .push_rows(&["zip"], vec![vec![Value::I32(15203)], vec![Value::I32(15213)]]);
        let zips = listings
            .list_zips("PA", "Pittsburgh")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(zips, vec![15203, 15213]);
        let (_, params) = listings.connection().last_call();
        assert_eq!(params, vec![Value::from("PA"), Value::from("Pittsburgh")]);
    }

    #[tokio::test]
    async fn test_category_filter_selects_the_template() {
        let listings = listings().await;

        let no_categories: &[&str] = &[];
        listings.list_businesses(15203, no_categories).await.unwrap();
        let (sql, params) = listings.connection().last_call();
        assert!(!sql.contains("ANY"));
        assert_eq!(params, vec![Value::I32(15203)]);

        listings
            .list_businesses(15203, &["Pizza", "Bars"])
            .await
            .unwrap();
        let (sql, params) = listings.connection().last_call();
        assert!(sql.contains("ANY($2)"));
        assert_eq!(
            params,
            vec![
                Value::I32(15203),
                Value::List(vec!["Pizza".into(), "Bars".into()])
            ]
        );
    }

    #[tokio::test]
    async fn test_business_rows_decode_and_outlive_the_cursor() {
        let listings = listings().await;
        let columns = [
            "business_id",
            "business_name",
            "business_address",
            "business_state",
            "city",
            "zip",
            "stars",
        ];
        listings.connection().push_rows(
            &columns,
            vec![
                vec![
                    "b-1".into(),
                    "Primanti Bros".into(),
                    "46 18th St".into(),
                    "PA".into(),
                    "Pittsburgh".into(),
                    Value::I32(15222),
                    Value::F64(4.0),
                ],
                vec![
                    "b-2".into(),
                    "Pamela's".into(),
                    Value::Null,
                    "PA".into(),
                    "Pittsburgh".into(),
                    Value::I32(15222),
                    Value::Null,
                ],
            ],
        );
        let mut cursor = listings.list_businesses(15222, &[] as &[String]).await.unwrap();
        let first = cursor.next().await.unwrap().unwrap();
        let second = cursor.next().await.unwrap().unwrap();
        assert!(cursor.next().await.is_none());

        assert_eq!(first.get::<String>("business_name").unwrap(), "Primanti Bros");
        let business: Business = second.to().unwrap();
        assert_eq!(business.business_id, "b-2");
        assert_eq!(business.business_address, None);
        assert_eq!(business.zip, Some(15222));
    }

    #[tokio::test]
    async fn test_insert_tip_binds_in_declared_order() {
        let listings = listings().await;
        let date = NaiveDate::from_ymd_opt(2023, 8, 9)
            .unwrap()
            .and_hms_opt(10, 11, 12)
            .unwrap();
        let inserted = listings
            .insert_tip("u-1", "b-1", "Get the fries on the sandwich.", date)
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        let (sql, params) = listings.connection().last_call();
        assert!(sql.starts_with("INSERT INTO tip"));
        assert_eq!(
            params,
            vec![
                Value::from("u-1"),
                Value::from("b-1"),
                Value::DateTime(date),
                Value::from("Get the fries on the sandwich."),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_tips_decodes_rows() {
        let listings = listings().await;
        let date = NaiveDate::from_ymd_opt(2023, 8, 9)
            .unwrap()
            .and_hms_opt(10, 11, 12)
            .unwrap();
        listings.connection().push_rows(
            &["user_id", "business_id", "date_posted", "body"],
            vec![vec!["u-1".into(), "b-1".into(), Value::DateTime(date), "Great".into()]],
        );
        let tips = listings.list_tips("b-1").await.unwrap().try_collect().await.unwrap();
        assert_eq!(
            tips,
            vec![Tip {
                user_id: "u-1".into(),
                business_id: "b-1".into(),
                date_posted: date,
                body: "Great".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_repeated_reads_run_again() {
        let listings = listings().await;
        listings
            .connection()
            .push_rows(&["business_state"], vec![vec!["PA".into()]]);
        listings
            .connection()
            .push_rows(&["business_state"], vec![vec!["PA".into()]]);

        let first = listings.list_states().await.unwrap().try_collect().await.unwrap();
        let second = listings.list_states().await.unwrap().try_collect().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(listings.connection().calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_statement_kind_must_match_the_call() {
        let listings = listings().await;

        let err = listings
            .session()
            .execute(&listings.statements.all_states, &())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Bind(ref m) if m.contains("allStates")), "{}", err);

        let args = TipArgs {
            user: "u-1",
            business: "b-1",
            date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            body: "Great",
        };
        let err = listings
            .session()
            .query(&listings.statements.insert_tip, &args, Ok)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Bind(ref m) if m.contains("insertTip")), "{}", err);

        assert!(listings.connection().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close() {
        listings().await.close().await.unwrap();
    }
}
