use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::config::groups::{GroupSource, Platform};
use crate::core::cancel::CancelToken;
use crate::core::deleter;
use crate::core::events::{Event, EventSender};
use crate::core::group_scanner::GroupScanner;
use crate::core::progress::{ProgressSnapshot, ProgressTracker};
use crate::core::prober::SizeProber;
use crate::error::EngineError;
use crate::models::scan_result::{total_size, GroupResult};
use crate::stats::StatsSink;

use super::{emit, ScanSlot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleScanState {
    Idle,
    Scanning { current_path: PathBuf },
    Completed(Vec<GroupResult>),
    Error(String),
}

impl SimpleScanState {
    pub fn is_scanning(&self) -> bool {
        matches!(self, SimpleScanState::Scanning { .. })
    }
}

/// Simple mode: measure the configured cleanup targets for one platform.
pub struct SimpleSession {
    inner: Arc<Inner>,
}

struct Inner {
    prober: Arc<SizeProber>,
    source: Arc<dyn GroupSource>,
    platform: Platform,
    stats: Arc<dyn StatsSink>,
    events: Option<EventSender>,
    progress: Arc<ProgressTracker>,
    state: watch::Sender<SimpleScanState>,
    busy: watch::Sender<bool>,
    deleting: AtomicBool,
    scan: ScanSlot,
}

impl SimpleSession {
    pub fn new(
        prober: Arc<SizeProber>,
        source: Arc<dyn GroupSource>,
        platform: Platform,
        stats: Arc<dyn StatsSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                prober,
                source,
                platform,
                stats,
                events: None,
                progress: Arc::new(ProgressTracker::new()),
                state: watch::Sender::new(SimpleScanState::Idle),
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

    pub fn subscribe(&self) -> watch::Receiver<SimpleScanState> {
        self.inner.state.subscribe()
    }

    pub fn busy(&self) -> watch::Receiver<bool> {
        self.inner.busy.subscribe()
    }

    pub fn state(&self) -> SimpleScanState {
        self.inner.state.borrow().clone()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.inner.progress.snapshot()
    }

    /// Load the groups for this session's platform and scan them, replacing
    /// any scan in progress. Refused while a deletion is in flight.
    pub fn start_scan(&self) -> Result<(), EngineError> {
        if self.inner.deleting.load(Ordering::SeqCst) {
            return Err(EngineError::Busy);
        }

        let cancel = self.inner.scan.begin();
        self.inner.progress.reset();
        self.inner.state.send_replace(SimpleScanState::Scanning {
            current_path: PathBuf::new(),
        });
        self.inner.refresh_busy();
        tracing::info!("starting simple scan for {}", self.inner.platform);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let worker = Arc::clone(&inner);
            let token = cancel.clone();
            let result = tokio::task::spawn_blocking(move || -> Result<Option<Vec<GroupResult>>, EngineError> {
                let groups = worker.source.load(worker.platform)?;
                let scanner = GroupScanner::with_progress(Arc::clone(&worker.prober), Arc::clone(&worker.progress));
                Ok(scanner.scan(&groups, &token, &|path: &Path, scanned: usize| {
                    worker.report_progress(&token, path, scanned)
                }))
            })
            .await;

            match result {
                Ok(Ok(Some(groups))) => inner.finish(groups, &cancel),
                // cancelled: cancel_scan already went back to Idle
                Ok(Ok(None)) => {}
                Ok(Err(e)) => inner.fail(e.to_string(), &cancel),
                Err(e) => inner.fail(format!("scan task failed: {e}"), &cancel),
            }
            inner.scan.release(&cancel);
        });
        self.inner.scan.attach(handle);
        Ok(())
    }

    pub fn cancel_scan(&self) {
        if self.inner.scan.cancel() {
            emit(&self.inner.events, Event::ScanCancelled);
        }
        self.inner.state.send_replace(SimpleScanState::Idle);
        self.inner.refresh_busy();
    }

    pub async fn wait_for_scan(&self) {
        self.inner.scan.wait().await;
    }

    /// Delete every item of `group_name` and drop the group. Returns the
    /// bytes freed.
    pub async fn delete_group(&self, group_name: &str) -> Result<u64, EngineError> {
        let name = group_name.to_string();
        self.run_delete(Subject::Group(group_name.to_string()), move |groups| {
            let (remaining, freed) = deleter::delete_group(groups, &name);
            Ok((remaining, freed))
        })
        .await
    }

    /// Delete one item or one sub-entry by path. Returns the bytes freed.
    pub async fn delete_item(&self, path: &Path) -> Result<u64, EngineError> {
        let target = path.to_path_buf();
        self.run_delete(Subject::Path(path.to_path_buf()), move |groups| {
            deleter::delete_item(groups, &target).map_err(EngineError::from)
        })
        .await
    }

    async fn run_delete<F>(&self, subject: Subject, op: F) -> Result<u64, EngineError>
    where
        F: FnOnce(&[GroupResult]) -> Result<(Vec<GroupResult>, u64), EngineError> + Send + 'static,
    {
        if self.inner.state.borrow().is_scanning() {
            return Err(EngineError::Busy);
        }
        if self.inner.deleting.swap(true, Ordering::SeqCst) {
            return Err(EngineError::Busy);
        }
        self.inner.refresh_busy();

        let inner = Arc::clone(&self.inner);
        let result = tokio::task::spawn_blocking(move || inner.delete_blocking(op)).await;

        self.inner.deleting.store(false, Ordering::SeqCst);
        self.inner.refresh_busy();

        let outcome = result.map_err(|e| EngineError::Io(std::io::Error::other(e)))?;
        match outcome {
            Ok(freed) => {
                if freed > 0 {
                    self.inner.stats.add_cleaned_space(freed);
                }
                emit(&self.inner.events, subject.deleted(freed));
                Ok(freed)
            }
            Err(e) => {
                tracing::warn!("delete failed: {}", e);
                emit(&self.inner.events, subject.failed(&e));
                Err(e)
            }
        }
    }
}

/// What a simple-mode deletion targets, for event reporting.
enum Subject {
    Group(String),
    Path(PathBuf),
}

impl Subject {
    fn deleted(self, freed: u64) -> Event {
        match self {
            Subject::Group(group_name) => Event::GroupDeleted { group_name, freed },
            Subject::Path(path) => Event::Deleted { path, freed },
        }
    }

    fn failed(self, error: &EngineError) -> Event {
        let error = error.to_string();
        match self {
            Subject::Group(group_name) => Event::GroupDeleteFailed { group_name, error },
            Subject::Path(path) => Event::DeleteFailed { path, error },
        }
    }
}

impl Drop for SimpleSession {
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
            *state = SimpleScanState::Scanning {
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

    fn finish(&self, groups: Vec<GroupResult>, cancel: &CancelToken) {
        let size = total_size(&groups);
        let published = self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = SimpleScanState::Completed(groups);
            true
        });
        if !published {
            return;
        }
        self.refresh_busy();

        let elapsed = self.progress.elapsed();
        tracing::info!("simple scan completed: {} bytes in {:?}", size, elapsed);
        emit(&self.events, Event::ScanCompleted {
            total_size: size,
            duration_ms: elapsed.as_millis() as u64,
        });
    }

    fn fail(&self, message: String, cancel: &CancelToken) {
        tracing::error!("simple scan failed: {}", message);
        let published = self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = SimpleScanState::Error(message.clone());
            true
        });
        if published {
            self.refresh_busy();
            emit(&self.events, Event::ScanFailed { error: message });
        }
    }

    /// Swap in the new list under the state lock so observers never see the
    /// filesystem and the list disagree. Readers wait out the removal; a
    /// stale list that still offers deleted paths would be worse.
    fn delete_blocking<F>(&self, op: F) -> Result<u64, EngineError>
    where
        F: FnOnce(&[GroupResult]) -> Result<(Vec<GroupResult>, u64), EngineError>,
    {
        let mut outcome = Err(EngineError::NoScanResult);
        self.state.send_if_modified(|state| {
            let SimpleScanState::Completed(groups) = state else {
                return false;
            };
            match op(groups) {
                Ok((remaining, freed)) => {
                    *groups = remaining;
                    outcome = Ok(freed);
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });
        outcome
    }
}
