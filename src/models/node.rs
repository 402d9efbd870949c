use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Index of a node inside a [`Tree`] arena.
pub type NodeId = usize;

/// One directory in a custom-mode size map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub is_directory: bool,
    pub children: Vec<NodeId>,
    pub is_deleted: bool,
}

impl TreeNode {
    pub fn directory(path: PathBuf, size: u64) -> Self {
        let name = display_name(&path);
        Self {
            name,
            path,
            size,
            is_directory: true,
            children: Vec::new(),
            is_deleted: false,
        }
    }

    pub fn percentage(&self, total_size: u64) -> f64 {
        if total_size == 0 {
            return 0.0;
        }
        (self.size as f64 / total_size as f64) * 100.0
    }

    pub fn human_readable_size(&self) -> String {
        human_readable_size(self.size)
    }
}

/// Arena-backed directory tree. Children refer to their nodes by index and
/// nothing points back up; ancestors are recovered by searching from the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    root: NodeId,
}

impl Tree {
    pub fn new(root: TreeNode) -> Self {
        Self {
            nodes: vec![root],
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &TreeNode {
        &self.nodes[self.root]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    /// Append `node` under `parent` and return its id.
    pub fn add_child(&mut self, parent: NodeId, node: TreeNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &TreeNode> + '_ {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&c| &self.nodes[c])
    }

    pub fn find_by_path(&self, path: &Path) -> Option<NodeId> {
        self.find_by_path_from(self.root, path)
    }

    fn find_by_path_from(&self, id: NodeId, path: &Path) -> Option<NodeId> {
        let node = &self.nodes[id];
        if node.path == path {
            return Some(id);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_by_path_from(child, path))
    }

    /// Ids from the root down to `target`, both inclusive.
    pub fn path_to(&self, target: NodeId) -> Option<Vec<NodeId>> {
        let mut trail = Vec::new();
        if self.search(self.root, target, &mut trail) {
            Some(trail)
        } else {
            None
        }
    }

    fn search(&self, id: NodeId, target: NodeId, trail: &mut Vec<NodeId>) -> bool {
        trail.push(id);
        if id == target {
            return true;
        }
        for &child in &self.nodes[id].children {
            if self.search(child, target, trail) {
                return true;
            }
        }
        trail.pop();
        false
    }

    /// Every node in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> + '_ {
        let mut stack = vec![self.root];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = &self.nodes[id];
            stack.extend(node.children.iter().rev().copied());
            Some((id, node))
        })
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub fn human_readable_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
