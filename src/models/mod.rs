pub mod business;
pub mod db_config;

pub use business::{Business, Tip};
pub use db_config::ConnectOptions;
