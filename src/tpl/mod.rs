pub(crate) mod engine;
mod parser;
mod render;

pub use engine::{SqlParam, SqlTemplate};

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Text(String),
    /// `#{name,jdbcType=TYPE}`; attributes other than `jdbcType` are ignored.
    Var {
        name: String,
        jdbc_type: Option<String>,
    },
}
