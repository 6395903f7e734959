//! Atlassian Document Format (rich text) conversion.
//!
//! [`to_plain_text`] never fails: node types it does not know are reduced by
//! concatenating their children, so new upstream node types still render.

use crate::jira::AdfNode;
use serde_json::{json, Value};

/// Reduce a rich-text tree to plain text.
pub fn to_plain_text(node: &AdfNode) -> String {
    match node.node_type.as_str() {
        "doc" | "listItem" | "panel" | "expand" => join_blocks(&node.content),
        "paragraph" | "heading" => concat(&node.content),
        "text" => node.text.clone().unwrap_or_default(),
        "hardBreak" => "\n".to_string(),
        "bulletList" => node
            .content
            .iter()
            .map(|item| list_item("- ", item))
            .collect::<Vec<_>>()
            .join("\n"),
        "orderedList" => {
            let start = node.attr_u64("order").unwrap_or(1);
            node.content
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let number = start.saturating_add(i as u64);
                    list_item(&format!("{}. ", number), item)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        "blockquote" => join_blocks(&node.content)
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        "codeBlock" => {
            let language = node.attr_str("language").unwrap_or_default();
            format!("```{}\n{}\n```", language, concat(&node.content))
        }
        "mention" | "emoji" => node
            .attr_str("text")
            .map(str::to_string)
            .unwrap_or_else(|| concat(&node.content)),
        "inlineCard" => node
            .attr_str("url")
            .map(str::to_string)
            .unwrap_or_else(|| concat(&node.content)),
        "rule" => "---".to_string(),
        _ => concat(&node.content),
    }
}

/// Build a rich-text document from plain text.
///
/// Blank lines separate paragraphs; single newlines become hard breaks.
pub fn from_plain_text(text: &str) -> Value {
    let normalized = text.replace("\r\n", "\n");
    let paragraphs: Vec<Value> = normalized
        .split("\n\n")
        .map(|block| block.trim_matches('\n'))
        .filter(|block| !block.trim().is_empty())
        .map(|block| {
            let mut content = Vec::new();
            for (i, line) in block.split('\n').enumerate() {
                if i > 0 {
                    content.push(json!({ "type": "hardBreak" }));
                }
                if !line.is_empty() {
                    content.push(json!({ "type": "text", "text": line }));
                }
            }
            json!({ "type": "paragraph", "content": content })
        })
        .collect();

    json!({ "type": "doc", "version": 1, "content": paragraphs })
}

fn concat(nodes: &[AdfNode]) -> String {
    nodes.iter().map(to_plain_text).collect()
}

fn join_blocks(nodes: &[AdfNode]) -> String {
    nodes
        .iter()
        .map(to_plain_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a list item with `marker`, indenting continuation lines.
fn list_item(marker: &str, item: &AdfNode) -> String {
    let indent = " ".repeat(marker.len());
    let text = match item.node_type.as_str() {
        // Blocks inside one item sit on consecutive lines.
        "listItem" => item
            .content
            .iter()
            .map(to_plain_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => to_plain_text(item),
    };

    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{}{}", marker, line)
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
