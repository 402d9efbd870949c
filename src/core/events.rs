use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum Event {
    // Scan progress
    Progress { scanned: usize, current_path: PathBuf },

    // Scan lifecycle
    ScanStarted { path: PathBuf },
    ScanCompleted { total_size: u64, duration_ms: u64 },
    ScanCancelled,
    ScanFailed { error: String },

    // Deletion
    Deleted { path: PathBuf, freed: u64 },
    DeleteFailed { path: PathBuf, error: String },
    GroupDeleted { group_name: String, freed: u64 },
    GroupDeleteFailed { group_name: String, error: String },
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
