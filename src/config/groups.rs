//! Declarative cleanup targets, keyed by platform.
//!
//! The config is a JSON document with one list of groups per platform:
//!
//! ```json
//! { "linuxList": [ { "groupName": "Caches", "groupImage": "cache",
//!     "items": [ { "name": "Cargo registry", "type": "folder", "path": "~/.cargo/registry" } ] } ] }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::scan_result::ItemKind;

const BUILTIN: &str = include_str!("default_groups.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Macos,
    Ios,
    Android,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else {
            Platform::Linux
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Ios => "ios",
            Platform::Android => "android",
        };
        f.write_str(name)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::Macos),
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupTarget {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupGroup {
    pub group_name: String,
    #[serde(default)]
    pub group_image: String,
    pub items: Vec<CleanupTarget>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupConfig {
    pub windows_list: Vec<CleanupGroup>,
    pub linux_list: Vec<CleanupGroup>,
    pub macos_list: Vec<CleanupGroup>,
    pub ios_list: Vec<CleanupGroup>,
    pub android_list: Vec<CleanupGroup>,
}

impl GroupConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN)
    }

    pub fn for_platform(&self, platform: Platform) -> &[CleanupGroup] {
        match platform {
            Platform::Windows => &self.windows_list,
            Platform::Linux => &self.linux_list,
            Platform::Macos => &self.macos_list,
            Platform::Ios => &self.ios_list,
            Platform::Android => &self.android_list,
        }
    }
}

/// Supplies the groups for one simple-mode scan.
pub trait GroupSource: Send + Sync {
    fn load(&self, platform: Platform) -> Result<Vec<CleanupGroup>, ConfigError>;
}

impl GroupSource for GroupConfig {
    fn load(&self, platform: Platform) -> Result<Vec<CleanupGroup>, ConfigError> {
        Ok(self.for_platform(platform).to_vec())
    }
}

/// A config file read when the scan starts, so a broken file surfaces as a
/// scan error rather than a startup failure.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GroupSource for ConfigFile {
    fn load(&self, platform: Platform) -> Result<Vec<CleanupGroup>, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        GroupConfig::from_json(&text)?.load(platform)
    }
}
