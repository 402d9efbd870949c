use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::node::{NodeId, Tree};

#[derive(Serialize)]
struct Report<'a> {
    scan_path: &'a Path,
    total_size: u64,
    generated_at: DateTime<Local>,
    root: NodeReport<'a>,
}

#[derive(Serialize)]
struct NodeReport<'a> {
    name: &'a str,
    path: &'a Path,
    size: u64,
    deleted: bool,
    children: Vec<NodeReport<'a>>,
}

fn node_report(tree: &Tree, id: NodeId) -> Option<NodeReport<'_>> {
    let node = tree.get(id)?;
    Some(NodeReport {
        name: &node.name,
        path: &node.path,
        size: node.size,
        deleted: node.is_deleted,
        children: node
            .children
            .iter()
            .filter_map(|&child| node_report(tree, child))
            .collect(),
    })
}

/// Write the tree as nested JSON, deleted nodes included and flagged.
pub fn export_json(tree: &Tree, output_path: &Path) -> anyhow::Result<()> {
    let root = node_report(tree, tree.root())
        .ok_or_else(|| anyhow::anyhow!("tree has no root node"))?;
    let report = Report {
        scan_path: root.path,
        total_size: root.size,
        generated_at: Local::now(),
        root,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(output_path, json)?;
    Ok(())
}
