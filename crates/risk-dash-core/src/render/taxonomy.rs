use std::fmt::{self, Write};

use super::html::escape;
use crate::report::{NodeId, TaxonomyNode};
use crate::{DashboardError, Result};

/// Deepest nesting the mindmap will render.
pub const MAX_TAXONOMY_DEPTH: usize = 64;

/// Render the taxonomy depth-first, indenting each node by its depth.
///
/// Walks with an explicit stack so pathological input cannot exhaust the call
/// stack. A node id that reappears among its own ancestors is a cycle.
pub fn render_mindmap(root: &TaxonomyNode) -> Result<String> {
    let mut out = String::from(r#"<div class="mindmap">"#);
    let mut stack: Vec<(&TaxonomyNode, usize)> = vec![(root, 0)];
    let mut path: Vec<Option<&NodeId>> = Vec::new();

    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_TAXONOMY_DEPTH {
            return Err(DashboardError::MalformedData(format!(
                "taxonomy is nested deeper than {MAX_TAXONOMY_DEPTH} levels"
            )));
        }
        path.truncate(depth);
        if let Some(id) = node.node.as_ref() {
            if path.iter().flatten().any(|ancestor| *ancestor == id) {
                return Err(DashboardError::MalformedData(format!(
                    "taxonomy node {id} is its own ancestor"
                )));
            }
        }
        path.push(node.node.as_ref());

        write_node(&mut out, node, depth)?;
        // reversed so the first child is rendered first
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
    out.push_str("</div>");
    Ok(out)
}

fn write_node(out: &mut String, node: &TaxonomyNode, depth: usize) -> fmt::Result {
    let label = if node.label.trim().is_empty() {
        "(unnamed)".to_string()
    } else {
        escape(&node.label)
    };
    write!(
        out,
        r#"<div class="taxonomy-node depth-{depth}" style="margin-left: {indent}rem"><strong>{label}</strong>"#,
        indent = depth as f32 * 1.5,
    )?;
    if let Some(id) = &node.node {
        write!(
            out,
            r#"<span class="node-id">Node {}</span>"#,
            escape(&id.to_string())
        )?;
    }
    if let Some(summary) = node.summary.as_deref().filter(|s| !s.is_empty()) {
        write!(out, r#"<p class="summary">{}</p>"#, escape(summary))?;
    }
    if let Some(keywords) = node.keywords.as_ref().filter(|k| !k.is_empty()) {
        write!(
            out,
            r#"<p class="keywords">{}</p>"#,
            escape(&keywords.join(", "))
        )?;
    }
    out.push_str("</div>");
    Ok(())
}
