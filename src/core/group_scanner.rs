use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::config::groups::{CleanupGroup, CleanupTarget};
use crate::models::node::display_name;
use crate::models::scan_result::{GroupResult, ItemKind, ScannedItem, SubFolderEntry};

use super::cancel::CancelToken;
use super::fs::{expand_path, sorted_subdirectories};
use super::progress::ProgressTracker;
use super::prober::SizeProber;

/// Probes declared cleanup targets one at a time, in declared order.
pub struct GroupScanner {
    prober: Arc<SizeProber>,
    progress: Arc<ProgressTracker>,
}

impl GroupScanner {
    pub fn new(prober: Arc<SizeProber>) -> Self {
        Self::with_progress(prober, Arc::new(ProgressTracker::new()))
    }

    pub fn with_progress(prober: Arc<SizeProber>, progress: Arc<ProgressTracker>) -> Self {
        Self { prober, progress }
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Scan every group. Returns `None` if cancelled; targets that do not
    /// exist are left out, and groups with nothing found are dropped.
    pub fn scan(
        &self,
        groups: &[CleanupGroup],
        cancel: &CancelToken,
        on_progress: &dyn Fn(&Path, usize),
    ) -> Option<Vec<GroupResult>> {
        let total: usize = groups.iter().map(|g| g.items.len()).sum();
        tracing::info!("scanning {} groups with {} targets", groups.len(), total);

        let mut results = Vec::new();
        for group in groups {
            let mut items = Vec::new();
            for target in &group.items {
                if cancel.is_cancelled() {
                    tracing::info!("group scan cancelled");
                    return None;
                }
                let scanned = self.progress.entries_probed.load(Ordering::Relaxed);
                on_progress(&expand_path(&target.path), scanned);

                match self.scan_item(target) {
                    Some(item) => {
                        tracing::debug!("found {} ({} bytes)", item.name, item.size);
                        self.progress.record(item.size);
                        items.push(item);
                    }
                    None => tracing::debug!("not found: {}", target.path),
                }
            }
            if !items.is_empty() {
                results.push(GroupResult {
                    group_name: group.group_name.clone(),
                    group_image: group.group_image.clone(),
                    items,
                });
            }
        }

        tracing::info!(
            "group scan finished: {} items in {} groups",
            results.iter().map(|g| g.items.len()).sum::<usize>(),
            results.len()
        );
        Some(results)
    }

    /// Measure one target, or `None` if it does not exist.
    pub fn scan_item(&self, target: &CleanupTarget) -> Option<ScannedItem> {
        let path = expand_path(&target.path);
        if !path.exists() {
            return None;
        }

        let (size, sub_items) = match target.kind {
            ItemKind::File => (std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0), Vec::new()),
            ItemKind::Folder => (self.prober.size(&path), Vec::new()),
            ItemKind::Folders => {
                let subs: Vec<SubFolderEntry> = sorted_subdirectories(&path)
                    .into_iter()
                    .map(|dir| SubFolderEntry {
                        name: display_name(&dir),
                        size: self.prober.size(&dir),
                        path: dir,
                    })
                    .collect();
                (subs.iter().map(|s| s.size).sum(), subs)
            }
        };

        Some(ScannedItem {
            name: target.name.clone(),
            path: target.path.clone(),
            size,
            kind: target.kind,
            sub_items,
        })
    }
}
