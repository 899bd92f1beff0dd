use anyhow::{Context, Result};
use quick_xml::de;
use serde::Deserialize;
use std::collections::HashMap;

/// Mapper document compiled into the crate.
pub const LISTINGS_MAPPER: &[u8] = include_bytes!("../resources/mapper/listings.xml");

/// One statement declared in a mapper document.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlMapper {
    pub kind: StatementKind,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// Statements of one mapper document, keyed by id.
#[derive(Debug, Default)]
pub struct MapperSet {
    pub namespace: String,
    mappers: HashMap<String, SqlMapper>,
}

impl MapperSet {
    pub fn get(&self, id: &str) -> Option<&SqlMapper> {
        self.mappers.get(id)
    }
}

#[derive(Debug, Deserialize)]
struct Mapper {
    #[serde(rename = "@namespace")]
    namespace: String,
    #[serde(rename = "$value", default)]
    nodes: Vec<SqlNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SqlNode {
    Select(SqlItem),
    Insert(SqlItem),
    Update(SqlItem),
    Delete(SqlItem),
    #[serde(other)]
    Unknown,
}

impl SqlNode {
    fn into_item(self) -> Option<(StatementKind, SqlItem)> {
        match self {
            SqlNode::Select(item) => Some((StatementKind::Select, item)),
            SqlNode::Insert(item) => Some((StatementKind::Insert, item)),
            SqlNode::Update(item) => Some((StatementKind::Update, item)),
            SqlNode::Delete(item) => Some((StatementKind::Delete, item)),
            SqlNode::Unknown => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SqlItem {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "$text")]
    content: Option<String>,
}

/// Parses a mapper document held in memory.
pub fn load(asset: &[u8]) -> Result<MapperSet> {
    let content = std::str::from_utf8(asset).context("Mapper content is not valid UTF-8")?;
    process_mapper_data(content, "memory")
}

fn process_mapper_data(xml_content: &str, source: &str) -> Result<MapperSet> {
    let mapper: Mapper =
        de::from_str(xml_content).with_context(|| format!("Failed to parse mapper XML: {}", source))?;

    let mut set = MapperSet {
        namespace: mapper.namespace,
        mappers: HashMap::new(),
    };

    for node in mapper.nodes {
        let Some((kind, item)) = node.into_item() else {
            continue;
        };
        let content = item
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .with_context(|| format!("Statement '{}' in '{}' has no SQL", item.id, source))?;

        if set
            .mappers
            .insert(item.id.clone(), SqlMapper { kind, content })
            .is_some()
        {
            anyhow::bail!(
                "Duplicate statement id '{}' in '{}' (namespace '{}')",
                item.id,
                source,
                set.namespace
            );
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::registry::STATEMENT_IDS;

    #[test]
    fn test_load_embedded_mapper() {
        let set = load(LISTINGS_MAPPER).unwrap();
        assert_eq!(set.namespace, "listings");
        for id in STATEMENT_IDS {
            let expected = if id == "insertTip" {
                StatementKind::Insert
            } else {
                StatementKind::Select
            };
            assert_eq!(set.get(id).map(|m| m.kind), Some(expected), "statement {}", id);
        }
    }

    #[test]
    fn test_statement_kinds_follow_element_names() {
        let xml = r#"<mapper namespace="kinds">
            <select id="s">SELECT 1</select>
            <insert id="i">INSERT INTO t VALUES (1)</insert>
            <update id="u">UPDATE t SET a = 1</update>
            <delete id="d">DELETE FROM t</delete>
        </mapper>"#;
        let set = load(xml.as_bytes()).unwrap();
        assert_eq!(set.get("s").unwrap().kind, StatementKind::Select);
        assert_eq!(set.get("i").unwrap().kind, StatementKind::Insert);
        assert_eq!(set.get("u").unwrap().kind, StatementKind::Update);
        assert_eq!(set.get("d").unwrap().kind, StatementKind::Delete);
        assert_eq!(set.get("d").unwrap().content, "DELETE FROM t");
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let xml = r#"<mapper namespace="dup">
            <select id="a">SELECT 1</select>
            <select id="a">SELECT 2</select>
        </mapper>"#;
        let err = load(xml.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_empty_statement_is_rejected() {
        let xml = r#"<mapper namespace="empty"><select id="a">  </select></mapper>"#;
        assert!(load(xml.as_bytes()).is_err());
    }
}
