use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::EngineError;
use crate::models::node::{NodeId, Tree, TreeNode};

use super::cancel::CancelToken;
use super::fs::sorted_subdirectories;
use super::progress::ProgressTracker;
use super::prober::SizeProber;

/// Builds a per-directory size map.
///
/// Each node's size is measured independently by the prober; children exist
/// for drill-down and are never summed into their parent. Directories are
/// visited depth-first, pre-order, children in lowercase-name order.
pub struct TreeBuilder {
    prober: Arc<SizeProber>,
    progress: Arc<ProgressTracker>,
}

impl TreeBuilder {
    pub fn new(prober: Arc<SizeProber>) -> Self {
        Self::with_progress(prober, Arc::new(ProgressTracker::new()))
    }

    pub fn with_progress(prober: Arc<SizeProber>, progress: Arc<ProgressTracker>) -> Self {
        Self { prober, progress }
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Build the tree under `root`, calling `on_progress` with each directory
    /// before it is sized. If `cancel` fires, recursion stops and the partial
    /// tree is returned; the caller decides not to publish it.
    pub fn build(
        &self,
        root: &Path,
        cancel: &CancelToken,
        on_progress: &dyn Fn(&Path, usize),
    ) -> Result<Tree, EngineError> {
        if !root.is_dir() {
            return Err(EngineError::NotADirectory(root.to_path_buf()));
        }

        tracing::info!("building tree for {}", root.display());
        let size = self.probe(root, on_progress);
        let mut tree = Tree::new(TreeNode::directory(root.to_path_buf(), size));
        let root_id = tree.root();
        self.build_children(&mut tree, root_id, cancel, on_progress);

        if cancel.is_cancelled() {
            tracing::info!("tree build cancelled at {} nodes", tree.len());
        }
        Ok(tree)
    }

    fn build_children(
        &self,
        tree: &mut Tree,
        parent: NodeId,
        cancel: &CancelToken,
        on_progress: &dyn Fn(&Path, usize),
    ) {
        let parent_path = match tree.get(parent) {
            Some(node) => node.path.clone(),
            None => return,
        };
        let subdirs = sorted_subdirectories(&parent_path);
        tracing::debug!("{} subdirectories in {}", subdirs.len(), parent_path.display());

        for dir in subdirs {
            if cancel.is_cancelled() {
                return;
            }
            let size = self.probe(&dir, on_progress);
            let child = tree.add_child(parent, TreeNode::directory(dir, size));
            self.build_children(tree, child, cancel, on_progress);
        }
    }

    fn probe(&self, path: &Path, on_progress: &dyn Fn(&Path, usize)) -> u64 {
        let scanned = self.progress.entries_probed.load(Ordering::Relaxed);
        on_progress(path, scanned);
        let size = self.prober.size(path);
        self.progress.record(size);
        size
    }
}
