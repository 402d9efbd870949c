use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::core::analyzer::{Analyzer, Bucket};
use crate::core::cancel::CancelToken;
use crate::core::deleter;
use crate::core::events::{Event, EventSender};
use crate::core::fs::expand_path;
use crate::core::progress::{ProgressSnapshot, ProgressTracker};
use crate::core::prober::SizeProber;
use crate::core::tree_builder::TreeBuilder;
use crate::error::EngineError;
use crate::models::node::{NodeId, Tree};
use crate::stats::StatsSink;

use super::{emit, ScanSlot};

#[derive(Debug, Clone)]
pub enum CustomScanState {
    Idle,
    Scanning { current_path: PathBuf },
    Completed(Tree),
}

impl CustomScanState {
    pub fn is_scanning(&self) -> bool {
        matches!(self, CustomScanState::Scanning { .. })
    }
}

/// Custom mode: a size map of one directory, drilled into and pruned in place.
pub struct CustomSession {
    inner: Arc<Inner>,
}

struct Inner {
    prober: Arc<SizeProber>,
    stats: Arc<dyn StatsSink>,
    events: Option<EventSender>,
    progress: Arc<ProgressTracker>,
    state: watch::Sender<CustomScanState>,
    selected: watch::Sender<Option<NodeId>>,
    expanded: watch::Sender<BTreeSet<PathBuf>>,
    busy: watch::Sender<bool>,
    deleting: AtomicBool,
    scan: ScanSlot,
}

impl CustomSession {
    pub fn new(prober: Arc<SizeProber>, stats: Arc<dyn StatsSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                prober,
                stats,
                events: None,
                progress: Arc::new(ProgressTracker::new()),
                state: watch::Sender::new(CustomScanState::Idle),
                selected: watch::Sender::new(None),
                expanded: watch::Sender::new(BTreeSet::new()),
                busy: watch::Sender::new(false),
                deleting: AtomicBool::new(false),
                scan: ScanSlot::default(),
            }),
        }
    }

    /// Also send lifecycle events to `events`. Call before the first scan.
    pub fn with_events(mut self, events: EventSender) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.events = Some(events);
        }
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<CustomScanState> {
        self.inner.state.subscribe()
    }

    pub fn selection(&self) -> watch::Receiver<Option<NodeId>> {
        self.inner.selected.subscribe()
    }

    pub fn expansion(&self) -> watch::Receiver<BTreeSet<PathBuf>> {
        self.inner.expanded.subscribe()
    }

    /// True while a scan or a deletion is in flight.
    pub fn busy(&self) -> watch::Receiver<bool> {
        self.inner.busy.subscribe()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.inner.progress.snapshot()
    }

    /// Start scanning `root` (`~` is expanded), cancelling any scan already
    /// running. Refused while a deletion is in flight.
    pub fn start_scan(&self, root: &str) -> Result<(), EngineError> {
        if self.inner.deleting.load(Ordering::SeqCst) {
            return Err(EngineError::Busy);
        }

        let root = std::path::absolute(expand_path(root))?;
        let cancel = self.inner.scan.begin();

        self.inner.progress.reset();
        self.inner.state.send_replace(CustomScanState::Scanning {
            current_path: root.clone(),
        });
        self.inner.selected.send_replace(None);
        self.inner.expanded.send_replace(BTreeSet::new());
        self.inner.refresh_busy();
        emit(&self.inner.events, Event::ScanStarted { path: root.clone() });

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let worker = Arc::clone(&inner);
            let token = cancel.clone();
            let result = tokio::task::spawn_blocking(move || {
                let builder = TreeBuilder::with_progress(Arc::clone(&worker.prober), Arc::clone(&worker.progress));
                builder.build(&root, &token, &|path: &Path, scanned: usize| {
                    worker.report_progress(&token, path, scanned)
                })
            })
            .await;

            match result {
                Ok(Ok(tree)) => inner.finish(tree, &cancel),
                Ok(Err(e)) => {
                    tracing::warn!("custom scan not started: {}", e);
                    inner.abandon(&cancel);
                }
                Err(e) => {
                    tracing::error!("custom scan task failed: {}", e);
                    inner.abandon(&cancel);
                }
            }
            inner.scan.release(&cancel);
        });
        self.inner.scan.attach(handle);
        Ok(())
    }

    /// Stop the running scan and forget the tree, selection and expansion.
    pub fn cancel_scan(&self) {
        if self.inner.scan.cancel() {
            emit(&self.inner.events, Event::ScanCancelled);
        }
        self.inner.state.send_replace(CustomScanState::Idle);
        self.inner.selected.send_replace(None);
        self.inner.expanded.send_replace(BTreeSet::new());
        self.inner.refresh_busy();
    }

    /// Wait for the most recently started scan task to exit.
    pub async fn wait_for_scan(&self) {
        self.inner.scan.wait().await;
    }

    /// Run `f` against the completed tree, if there is one.
    pub fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> Option<R> {
        match &*self.inner.state.borrow() {
            CustomScanState::Completed(tree) => Some(f(tree)),
            _ => None,
        }
    }

    pub fn select_node(&self, id: NodeId) -> Result<(), EngineError> {
        let exists = self
            .with_tree(|tree| tree.get(id).is_some())
            .ok_or(EngineError::NoScanResult)?;
        if !exists {
            return Err(EngineError::UnknownNode(id));
        }
        self.inner.selected.send_replace(Some(id));
        Ok(())
    }

    /// Absolute path of the selected node, for handing to a file manager.
    pub fn selected_path(&self) -> Option<PathBuf> {
        let id = (*self.inner.selected.borrow())?;
        self.with_tree(|tree| tree.get(id).map(|n| n.path.clone())).flatten()
    }

    pub fn toggle_expansion(&self, path: &Path) {
        self.inner.expanded.send_modify(|expanded| {
            if !expanded.remove(path) {
                expanded.insert(path.to_path_buf());
            }
        });
    }

    pub fn is_expanded(&self, path: &Path) -> bool {
        self.inner.expanded.borrow().contains(path)
    }

    pub fn top_buckets(&self, id: NodeId) -> Vec<Bucket> {
        self.with_tree(|tree| Analyzer::top_buckets(tree, id))
            .unwrap_or_default()
    }

    /// Delete `id` from disk and subtract its size from its ancestors.
    /// Returns the bytes freed.
    pub async fn delete_node(&self, id: NodeId) -> Result<u64, EngineError> {
        if self.inner.state.borrow().is_scanning() {
            return Err(EngineError::Busy);
        }
        if self.inner.deleting.swap(true, Ordering::SeqCst) {
            return Err(EngineError::Busy);
        }
        self.inner.refresh_busy();

        let inner = Arc::clone(&self.inner);
        let result = tokio::task::spawn_blocking(move || inner.delete_blocking(id)).await;

        self.inner.deleting.store(false, Ordering::SeqCst);
        self.inner.refresh_busy();

        let (path, outcome) = result.map_err(|e| EngineError::Io(std::io::Error::other(e)))?;
        match outcome {
            Ok(freed) => {
                if freed > 0 {
                    self.inner.stats.add_cleaned_space(freed);
                }
                emit(&self.inner.events, Event::Deleted { path, freed });
                Ok(freed)
            }
            Err(e) => {
                tracing::warn!("delete failed: {}", e);
                emit(&self.inner.events, Event::DeleteFailed {
                    path,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

impl Drop for CustomSession {
    fn drop(&mut self) {
        self.inner.scan.cancel();
    }
}

impl Inner {
    fn refresh_busy(&self) {
        let busy = self.state.borrow().is_scanning() || self.deleting.load(Ordering::SeqCst);
        self.busy.send_if_modified(|current| {
            let changed = *current != busy;
            *current = busy;
            changed
        });
    }

    fn report_progress(&self, cancel: &CancelToken, path: &Path, scanned: usize) {
        let published = self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = CustomScanState::Scanning {
                current_path: path.to_path_buf(),
            };
            true
        });
        if published {
            emit(&self.events, Event::Progress {
                scanned,
                current_path: path.to_path_buf(),
            });
        }
    }

    /// Publish a finished tree unless the scan was cancelled meanwhile.
    fn finish(&self, tree: Tree, cancel: &CancelToken) {
        let root = tree.root();
        let root_path = tree.root_node().path.clone();
        let total_size = tree.root_node().size;

        let published = self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = CustomScanState::Completed(tree);
            true
        });
        if !published {
            return;
        }

        self.selected.send_replace(Some(root));
        self.expanded.send_replace(BTreeSet::from([root_path]));
        self.refresh_busy();

        let elapsed = self.progress.elapsed();
        tracing::info!("custom scan completed: {} bytes in {:?}", total_size, elapsed);
        emit(&self.events, Event::ScanCompleted {
            total_size,
            duration_ms: elapsed.as_millis() as u64,
        });
    }

    fn abandon(&self, cancel: &CancelToken) {
        let reset = self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = CustomScanState::Idle;
            true
        });
        if reset {
            self.refresh_busy();
        }
    }

    /// Remove and propagate while holding the state lock, so no observer sees
    /// the entity gone with stale ancestor sizes. Readers block for the whole
    /// removal; only this blocking-pool thread and the CLI read the state, and
    /// a torn tree would be worse than a late one.
    fn delete_blocking(&self, id: NodeId) -> (PathBuf, Result<u64, EngineError>) {
        let mut path = PathBuf::new();
        let mut outcome = Err(EngineError::NoScanResult);
        self.state.send_if_modified(|state| {
            let CustomScanState::Completed(tree) = state else {
                return false;
            };
            if let Some(node) = tree.get(id) {
                path = node.path.clone();
            }
            let result = deleter::delete_node(tree, id);
            let changed = result.is_ok();
            outcome = result.map_err(EngineError::from);
            changed
        });
        (path, outcome)
    }
}
