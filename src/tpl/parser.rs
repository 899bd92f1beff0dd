use crate::tpl::AstNode;

pub fn parse_template(template: &str) -> Vec<AstNode> {
    let mut nodes: Vec<AstNode> = Vec::new();
    let mut pos = 0;
    let len = template.len();

    while pos < len {
        let remaining = &template[pos..];

        // 1. Check for #{var,attr=...}
        if remaining.starts_with("#{") {
            if let Some(end) = remaining.find('}') {
                if let Some(var) = parse_var(&remaining[2..end]) {
                    nodes.push(var);
                    pos += end + 1;
                    continue;
                }
            }
        }

        // 2. Text
        let next_var = remaining.find("#{").unwrap_or(remaining.len());
        if next_var > 0 {
            append_text(&mut nodes, &remaining[..next_var]);
            pos += next_var;
        } else {
            // Unmatched or empty '#{'
            append_text(&mut nodes, &remaining[0..2]);
            pos += 2;
        }
    }

    nodes
}

fn parse_var(body: &str) -> Option<AstNode> {
    let mut parts = body.split(',');
    let name = parts.next()?.trim();
    if name.is_empty() {
        return None;
    }
    let jdbc_type = parts
        .filter_map(|attr| attr.split_once('='))
        .find(|(k, _)| k.trim() == "jdbcType")
        .map(|(_, v)| v.trim().to_string());
    Some(AstNode::Var {
        name: name.to_string(),
        jdbc_type,
    })
}

fn append_text(nodes: &mut Vec<AstNode>, text: &str) {
    if let Some(AstNode::Text(last_text)) = nodes.last_mut() {
        last_text.push_str(text);
    } else {
        nodes.push(AstNode::Text(text.to_string()));
    }
}
