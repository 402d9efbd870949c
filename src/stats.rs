//! Cumulative cleanup statistics.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Receives the bytes freed by each successful deletion.
pub trait StatsSink: Send + Sync {
    fn add_cleaned_space(&self, bytes: u64);
    fn reset_stats(&self);
}

#[derive(Debug, Default)]
pub struct MemoryStats {
    total_cleaned: AtomicU64,
    items_deleted: AtomicU64,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_cleaned(&self) -> u64 {
        self.total_cleaned.load(Ordering::Relaxed)
    }

    pub fn items_deleted(&self) -> u64 {
        self.items_deleted.load(Ordering::Relaxed)
    }
}

impl StatsSink for MemoryStats {
    fn add_cleaned_space(&self, bytes: u64) {
        self.total_cleaned.fetch_add(bytes, Ordering::Relaxed);
        self.items_deleted.fetch_add(1, Ordering::Relaxed);
    }

    fn reset_stats(&self) {
        self.total_cleaned.store(0, Ordering::Relaxed);
        self.items_deleted.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub total_cleaned: u64,
    pub items_deleted: u64,
    pub last_cleaned: Option<DateTime<Local>>,
}

/// Stats kept in a JSON file, rewritten on every update.
pub struct StatsFile {
    path: PathBuf,
    record: Mutex<StatsRecord>,
}

impl StatsFile {
    /// Open `path`, starting from zero if it is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self {
            path,
            record: Mutex::new(record),
        }
    }

    pub fn record(&self) -> StatsRecord {
        self.record.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut StatsRecord)) {
        let Ok(mut record) = self.record.lock() else {
            return;
        };
        f(&mut record);
        if let Err(e) = save(&self.path, &record) {
            tracing::error!("failed to save stats to {}: {}", self.path.display(), e);
        }
    }
}

fn save(path: &Path, record: &StatsRecord) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(record)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl StatsSink for StatsFile {
    fn add_cleaned_space(&self, bytes: u64) {
        self.update(|record| {
            record.total_cleaned += bytes;
            record.items_deleted += 1;
            record.last_cleaned = Some(Local::now());
        });
    }

    fn reset_stats(&self) {
        self.update(|record| *record = StatsRecord::default());
    }
}
