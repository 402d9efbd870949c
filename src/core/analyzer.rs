use crate::models::node::{NodeId, Tree};

/// Number of children shown individually before the rest are merged.
pub const TOP_BUCKETS: usize = 10;

pub struct Analyzer;

impl Analyzer {
    /// Live children of `id`, largest first. Equal sizes keep discovery order.
    pub fn sorted_children(tree: &Tree, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = match tree.get(id) {
            Some(node) => node
                .children
                .iter()
                .copied()
                .filter(|&c| tree.get(c).is_some_and(|n| !n.is_deleted))
                .collect(),
            None => return Vec::new(),
        };
        // sort_by_key is stable
        children.sort_by_key(|&c| std::cmp::Reverse(tree.get(c).map_or(0, |n| n.size)));
        children
    }

    /// The ten largest live children, plus an "Others" bucket holding the
    /// rest when there are more than ten.
    pub fn top_buckets(tree: &Tree, id: NodeId) -> Vec<Bucket> {
        let sorted = Self::sorted_children(tree, id);

        let mut result: Vec<Bucket> = sorted
            .iter()
            .take(TOP_BUCKETS)
            .filter_map(|&c| tree.get(c).map(|n| (c, n)))
            .map(|(c, node)| Bucket {
                label: node.name.clone(),
                size: node.size,
                node: Some(c),
                merged_count: 0,
            })
            .collect();

        let rest = &sorted[sorted.len().min(TOP_BUCKETS)..];
        if !rest.is_empty() {
            result.push(Bucket {
                label: String::from("Others"),
                size: rest.iter().filter_map(|&c| tree.get(c)).map(|n| n.size).sum(),
                node: None,
                merged_count: rest.len(),
            });
        }

        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub size: u64,
    /// The child this bucket shows; `None` for "Others".
    pub node: Option<NodeId>,
    pub merged_count: usize,
}

impl Bucket {
    pub fn is_merged(&self) -> bool {
        self.node.is_none()
    }
}
