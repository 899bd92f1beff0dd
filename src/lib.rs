pub mod error;
pub mod executor;
pub mod listings;
pub mod mapper_loader;
pub mod models;
pub(crate) mod tpl;
pub mod udbc;
#[cfg(feature = "postgres")]
pub mod udbc_postgres;

pub use error::DbError;
pub use listings::Listings;
pub use models::{Business, ConnectOptions, Tip};
pub use tpl::{SqlParam, SqlTemplate};
pub use udbc::{Cursor, Row, Value, ValueType};
