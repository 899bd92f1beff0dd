pub mod registry;
pub mod session;

pub use registry::{Statement, StatementRegistry};
pub use session::Session;
