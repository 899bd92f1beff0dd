pub mod value;

pub mod connection;
pub mod cursor;
pub mod deserializer;
pub mod row;
pub mod serializer;

pub use connection::{Connection, RowStream};
pub use cursor::Cursor;
pub use row::Row;
pub use value::{Value, ValueType};
