use crate::tpl::AstNode;

pub(crate) struct RenderBuffer {
    pub sql: String,
    /// Parameter names in placeholder order; `$n` refers to `names[n - 1]`.
    pub names: Vec<String>,
}

/// Writes `nodes` as PostgreSQL text, numbering each distinct parameter once.
pub(crate) fn render(nodes: &[AstNode], buf: &mut RenderBuffer) {
    for node in nodes {
        match node {
            AstNode::Text(t) => buf.sql.push_str(t),
            AstNode::Var { name, .. } => {
                let seq = match buf.names.iter().position(|n| n == name) {
                    Some(idx) => idx + 1,
                    None => {
                        buf.names.push(name.clone());
                        buf.names.len()
                    }
                };
                buf.sql.push('$');
                buf.sql.push_str(&seq.to_string());
            }
        }
    }
}
