use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::groups::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Try `du`/PowerShell before walking the tree ourselves.
    pub native_probe: bool,
    /// Group config to use instead of the built-in one.
    pub groups_file: Option<PathBuf>,
    pub stats_file: PathBuf,
    /// Platform key for simple mode; the host platform when unset.
    pub platform: Option<Platform>,
}

impl Default for Settings {
    fn default() -> Self {
        let stats_file = data_dir()
            .unwrap_or_else(|| PathBuf::from(".bitcleaner"))
            .join("stats.json");

        Self {
            native_probe: true,
            groups_file: None,
            stats_file,
            platform: None,
        }
    }
}

impl Settings {
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }
}

fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("bitcleaner"))
}
