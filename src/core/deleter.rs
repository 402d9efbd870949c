//! Permanent deletion with size bookkeeping.
//!
//! Tree deletions subtract the removed node's size from every ancestor
//! instead of rescanning. Group-list deletions return a new list value.

use std::path::Path;

use crate::error::DeleteError;
use crate::models::node::{NodeId, Tree};
use crate::models::scan_result::{GroupResult, ItemKind, ScannedItem};

use super::fs::{expand_path, remove_path};

/// Remove `id`'s directory from disk, zero it, and subtract its previous size
/// from each ancestor. On failure the tree is not touched. Returns the bytes
/// freed.
pub fn delete_node(tree: &mut Tree, id: NodeId) -> Result<u64, DeleteError> {
    let node = tree.get(id).ok_or(DeleteError::UnknownNode(id))?;
    if node.is_deleted {
        return Err(DeleteError::AlreadyDeleted(node.path.clone()));
    }

    remove_path(&node.path)?;

    let node = tree.get_mut(id).ok_or(DeleteError::UnknownNode(id))?;
    let freed = node.size;
    node.is_deleted = true;
    node.size = 0;
    tracing::info!("deleted {} ({} bytes)", node.path.display(), freed);

    propagate_delta(tree, id, freed);
    Ok(freed)
}

/// Subtract `delta` from every node strictly above `id`.
pub fn propagate_delta(tree: &mut Tree, id: NodeId, delta: u64) {
    if delta == 0 {
        return;
    }
    let trail = match tree.path_to(id) {
        Some(trail) => trail,
        None => {
            tracing::warn!("node {} is not reachable from the root", id);
            return;
        }
    };

    for &ancestor in &trail[..trail.len() - 1] {
        if let Some(node) = tree.get_mut(ancestor) {
            if node.size < delta {
                tracing::warn!(
                    "size underflow on {}: {} - {}, clamping to 0",
                    node.path.display(),
                    node.size,
                    delta
                );
            }
            node.size = node.size.saturating_sub(delta);
        }
    }
}

/// Remove every item (and every sub-entry) of `group_name`. Returns the list
/// without that group and the bytes actually freed.
pub fn delete_group(groups: &[GroupResult], group_name: &str) -> (Vec<GroupResult>, u64) {
    let Some(group) = groups.iter().find(|g| g.group_name == group_name) else {
        tracing::warn!("no group named {}", group_name);
        return (groups.to_vec(), 0);
    };

    let freed: u64 = group.items.iter().map(remove_item).sum();
    tracing::info!("deleted group {} ({} bytes)", group_name, freed);

    let remaining = groups
        .iter()
        .filter(|g| g.group_name != group_name)
        .cloned()
        .collect();
    (remaining, freed)
}

fn remove_item(item: &ScannedItem) -> u64 {
    let mut freed = 0;
    for sub in &item.sub_items {
        match remove_path(&sub.path) {
            Ok(()) => freed += sub.size,
            Err(e) => tracing::warn!("{}", e),
        }
    }

    match remove_path(&expand_path(&item.path)) {
        Ok(()) => item.size.max(freed),
        // sub-entries already took the folder's contents
        Err(DeleteError::NotFound(_)) if item.kind == ItemKind::Folders => freed,
        Err(e) => {
            tracing::warn!("{}", e);
            freed
        }
    }
}

/// Remove one top-level item or one sub-entry, matched by path. A top-level
/// path may be given as declared (`~/...`) or expanded.
///
/// Emptied `Folders` items and emptied groups are dropped. If the removal
/// fails, nothing changes and the error is returned.
pub fn delete_item(
    groups: &[GroupResult],
    path: &Path,
) -> Result<(Vec<GroupResult>, u64), DeleteError> {
    let target = find_target(groups, path).ok_or_else(|| DeleteError::NotTracked(path.to_path_buf()))?;

    let freed = match target {
        Target::Item(item) => {
            remove_path(&expand_path(&item.path))?;
            item.size
        }
        Target::Sub(size) => {
            remove_path(path)?;
            size
        }
    };
    tracing::info!("deleted {} ({} bytes)", path.display(), freed);

    let updated = groups
        .iter()
        .filter_map(|group| {
            let items: Vec<ScannedItem> = group
                .items
                .iter()
                .filter_map(|item| without_path(item, path))
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(GroupResult {
                    items,
                    ..group.clone()
                })
            }
        })
        .collect();

    Ok((updated, freed))
}

enum Target<'a> {
    Item(&'a ScannedItem),
    Sub(u64),
}

fn find_target<'a>(groups: &'a [GroupResult], path: &Path) -> Option<Target<'a>> {
    for item in groups.iter().flat_map(|g| &g.items) {
        if item_matches(item, path) {
            return Some(Target::Item(item));
        }
        if let Some(sub) = item.sub_items.iter().find(|s| s.path == path) {
            return Some(Target::Sub(sub.size));
        }
    }
    None
}

fn item_matches(item: &ScannedItem, path: &Path) -> bool {
    Path::new(&item.path) == path || expand_path(&item.path) == path
}

fn without_path(item: &ScannedItem, path: &Path) -> Option<ScannedItem> {
    if item_matches(item, path) {
        return None;
    }
    if item.kind != ItemKind::Folders || !item.sub_items.iter().any(|s| s.path == path) {
        return Some(item.clone());
    }

    let mut item = item.clone();
    item.sub_items.retain(|s| s.path != path);
    if item.sub_items.is_empty() {
        return None;
    }
    item.resum();
    Some(item)
}
