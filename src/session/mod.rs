//! Scan sessions: the state machines that run scans and deletions on the
//! blocking pool and publish their state through `watch` channels.

pub mod custom;
pub mod simple;

use std::sync::Mutex;

use tokio::task::JoinHandle;

use crate::core::cancel::CancelToken;
use crate::core::events::{Event, EventSender};

pub use custom::{CustomScanState, CustomSession};
pub use simple::{SimpleScanState, SimpleSession};

/// The at-most-one scan task of a session.
#[derive(Default)]
struct ScanSlot {
    cancel: Mutex<Option<CancelToken>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScanSlot {
    /// Cancel whatever is running and hand out a token for the next scan.
    fn begin(&self) -> CancelToken {
        let token = CancelToken::new();
        if let Ok(mut current) = self.cancel.lock() {
            if let Some(previous) = current.replace(token.clone()) {
                previous.cancel();
            }
        }
        token
    }

    fn attach(&self, handle: JoinHandle<()>) {
        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
    }

    /// Cancel the running scan, if any. Returns whether one was running.
    fn cancel(&self) -> bool {
        match self.cancel.lock().ok().and_then(|mut c| c.take()) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget `token` once its scan has published, unless a newer scan
    /// already replaced it.
    fn release(&self, token: &CancelToken) {
        if let Ok(mut current) = self.cancel.lock() {
            if current.as_ref().is_some_and(|t| t.same_as(token)) {
                *current = None;
            }
        }
    }

    async fn wait(&self) {
        let handle = self.handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("scan task panicked: {}", e);
            }
        }
    }
}

fn emit(events: &Option<EventSender>, event: Event) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
