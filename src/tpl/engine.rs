use crate::error::DbError;
use crate::tpl::AstNode;
use crate::tpl::parser::parse_template;
use crate::tpl::render::{RenderBuffer, render};
use crate::udbc::serializer::to_value;
use crate::udbc::value::{Value, ValueType};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    pub name: String,
    pub ty: ValueType,
}

/// A mapper statement compiled to PostgreSQL text with its ordered, typed parameters.
#[derive(Debug, Clone)]
pub struct SqlTemplate {
    pub id: String,
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlTemplate {
    /// Compiles `content`. Every parameter must declare a known `jdbcType`,
    /// and repeated occurrences of a name must not disagree on it.
    pub fn compile(id: &str, content: &str) -> Result<Self, DbError> {
        let ast = parse_template(content.trim());

        let mut declared: HashMap<&str, ValueType> = HashMap::new();
        for node in &ast {
            let AstNode::Var { name, jdbc_type } = node else {
                continue;
            };
            let Some(jdbc_type) = jdbc_type else {
                continue;
            };
            let ty: ValueType = jdbc_type
                .parse()
                .map_err(|e| DbError::prepare(id, format!("parameter '{}': {}", name, e)))?;
            if let Some(prev) = declared.insert(name.as_str(), ty.clone()) {
                if prev != ty {
                    return Err(DbError::prepare(
                        id,
                        format!("parameter '{}' declared as both {} and {}", name, prev, ty),
                    ));
                }
            }
        }

        let mut buf = RenderBuffer {
            sql: String::with_capacity(content.len()),
            names: Vec::new(),
        };
        render(&ast, &mut buf);

        let params = buf
            .names
            .into_iter()
            .map(|name| {
                let ty = declared.get(name.as_str()).cloned().ok_or_else(|| {
                    DbError::prepare(id, format!("parameter '{}' has no jdbcType", name))
                })?;
                Ok(SqlParam { name, ty })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Self {
            id: id.to_string(),
            sql: buf.sql,
            params,
        })
    }

    pub fn types(&self) -> Vec<ValueType> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    /// Serializes `args` and orders the values to match the placeholders.
    ///
    /// `args` must serialize to a map (a struct, usually) whose keys are
    /// exactly the declared parameter names; `()` binds a statement without
    /// parameters. Each value is coerced to its declared type.
    pub fn bind<T: serde::Serialize + ?Sized>(&self, args: &T) -> Result<Vec<Value>, DbError> {
        let mut values = match to_value(args)? {
            Value::Map(map) => map,
            Value::Null => HashMap::new(),
            Value::List(list) if list.is_empty() => HashMap::new(),
            _ => {
                return Err(DbError::Bind(format!(
                    "{}: arguments must be a struct or map keyed by parameter name",
                    self.id
                )));
            }
        };

        let mut out = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let value = values.remove(&param.name).ok_or_else(|| {
                DbError::Bind(format!("{}: missing value for '{}'", self.id, param.name))
            })?;
            let value = param
                .ty
                .coerce(value)
                .map_err(|e| DbError::Bind(format!("{}: '{}': {}", self.id, param.name, e)))?;
            out.push(value);
        }

        if !values.is_empty() {
            let mut unknown: Vec<_> = values.into_keys().collect();
            unknown.sort();
            return Err(DbError::Bind(format!(
                "{}: unknown parameters {}",
                self.id,
                unknown.join(", ")
            )));
        }
        Ok(out)
    }
}
