use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a cleanup target is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
    /// A folder whose immediate subfolders are listed and sized one by one.
    Folders,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubFolderEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// A cleanup target that exists on disk, with its measured size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedItem {
    pub name: String,
    /// Path as declared in the group config, before expansion.
    pub path: String,
    pub size: u64,
    pub kind: ItemKind,
    pub sub_items: Vec<SubFolderEntry>,
}

impl ScannedItem {
    /// Recompute a `Folders` item's total from its remaining entries.
    pub fn resum(&mut self) {
        self.size = self.sub_items.iter().map(|s| s.size).sum();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResult {
    pub group_name: String,
    pub group_image: String,
    pub items: Vec<ScannedItem>,
}

impl GroupResult {
    pub fn total_size(&self) -> u64 {
        self.items.iter().map(|i| i.size).sum()
    }
}

pub fn total_size(groups: &[GroupResult]) -> u64 {
    groups.iter().map(GroupResult::total_size).sum()
}
