//! Part construction and placement
//!
//! Everything here except [`create_item`] runs with the catalog, character
//! state and scene already locked, in that order.

use super::state::{CharacterState, EquippedPart, Placement, PlayerColors};
use crate::assets::loader::demote_skinned;
use crate::assets::{AnimationClip, AssetLoader, LoadedAsset, Skeleton};
use crate::attachment::{attachment_site, resolve};
use crate::catalog::{default_transform, ItemDefinition, ItemStore};
use crate::materials::{apply_material_indices, apply_player_colors};
use crate::scene::{apply_transform, NodeId, SceneGraph, SceneHandle};
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) struct BuiltPart {
    pub node: NodeId,
    pub skinned: bool,
    pub skeleton: Option<Arc<Skeleton>>,
    pub clips: Vec<AnimationClip>,
}

/// Load an item's asset and turn it into a tagged, colored, unattached node
pub(crate) async fn create_item(
    loader: &AssetLoader,
    scene: &SceneHandle,
    item_id: &str,
    item: &ItemDefinition,
    slot_key: &str,
    colors: PlayerColors,
) -> BuiltPart {
    let loaded = match &item.file {
        Some(file) => loader.load(file).await,
        None => {
            debug!("Item '{}' has no file, using an empty part", item_id);
            LoadedAsset::default()
        }
    };

    let mut scene = scene.lock().await;
    let node = loaded.instantiate(&mut scene, item_id);
    if loaded.animation_failed {
        demote_skinned(&mut scene, node);
    }
    if let Some(n) = scene.get_mut(node) {
        n.meta.item_id = Some(item_id.to_string());
        n.meta.slot_key = Some(slot_key.to_string());
    }
    decorate(&mut scene, node, item, colors);

    let skinned = scene
        .traverse(node)
        .iter()
        .any(|&id| scene.get(id).and_then(|n| n.mesh()).map(|m| m.skinned).unwrap_or(false));

    BuiltPart {
        node,
        skinned,
        skeleton: loaded.skeleton,
        clips: loaded.clips,
    }
}

/// Material roles, colors and socket markers from the current definition
pub(crate) fn decorate(scene: &mut SceneGraph, node: NodeId, item: &ItemDefinition, colors: PlayerColors) {
    apply_material_indices(scene, node, item);
    apply_player_colors(scene, node, item, colors.primary, colors.secondary);
    rebuild_sockets(scene, node, item);
}

/// Replace the part's socket markers with one per anchor in `item`
pub fn rebuild_sockets(scene: &mut SceneGraph, part: NodeId, item: &ItemDefinition) -> usize {
    let stale: Vec<NodeId> = scene
        .children(part)
        .iter()
        .copied()
        .filter(|&c| scene.get(c).map(|n| n.meta.socket).unwrap_or(false))
        .collect();
    for marker in stale {
        scene.remove_subtree(marker);
    }

    for (anchor, record) in &item.attachment_points {
        let marker = scene.create_group(format!("socket:{}", anchor));
        if let Some(node) = scene.get_mut(marker) {
            node.meta.socket = true;
            node.meta.extra.insert("anchor".to_string(), anchor.clone());
            apply_transform(&mut node.transform, record);
        }
        scene.attach(part, marker);
    }
    item.attachment_points.len()
}

/// Hook the part in `slot` into the character: under the root for base slots,
/// under its parent part when that is present, otherwise queued on the parent.
/// Returns whether the part ended up attached.
pub(crate) fn place(
    catalog: &ItemStore,
    state: &mut CharacterState,
    scene: &mut SceneGraph,
    root: NodeId,
    slot: &str,
) -> bool {
    let Some(part) = state.active_models.get(slot).cloned() else {
        return false;
    };
    let fallback_item;
    let item = match catalog.get(&part.item_id) {
        Some(item) => item,
        None => {
            warn!("Item '{}' left the catalog, placing '{}' with defaults", part.item_id, slot);
            fallback_item = ItemDefinition::new(slot);
            &fallback_item
        }
    };

    let bases = catalog.base_slots();
    let placement = if bases.is_root_slot(slot) {
        let record = item
            .initial_transform
            .clone()
            .or_else(|| default_transform(slot))
            .unwrap_or_default();
        if let Some(node) = scene.get_mut(part.node) {
            apply_transform(&mut node.transform, &record);
        }
        if scene.parent(part.node) != Some(root) {
            scene.attach(root, part.node);
        }
        Placement::Root
    } else {
        let Some(site) = attachment_site(slot, item, bases) else {
            warn!("Slot '{}' has no attachment site", slot);
            return false;
        };
        let parent = state
            .active_models
            .get(&site.parent_slot)
            .filter(|p| !p.is_pending())
            .cloned();
        match parent {
            Some(parent) => {
                let parent_fallback;
                let parent_item = match catalog.get(&parent.item_id) {
                    Some(parent_item) => parent_item,
                    None => {
                        parent_fallback = ItemDefinition::new(site.parent_slot.clone());
                        &parent_fallback
                    }
                };
                let resolved = resolve(item, parent_item, &parent.item_id, &site, catalog.fallbacks());
                debug!(
                    "Placing '{}' on '{}' at '{}' ({:?})",
                    part.item_id, parent.item_id, site.slot_path, resolved.sources
                );
                if let Some(node) = scene.get_mut(part.node) {
                    apply_transform(&mut node.transform, &resolved.to_record());
                    node.meta.sub_item = true;
                }
                if scene.parent(part.node) != Some(parent.node) {
                    scene.attach(parent.node, part.node);
                }
                state.dequeue_pending(slot);
                state.link(&site.parent_slot, slot);
                Placement::Nested {
                    parent_slot: site.parent_slot,
                }
            }
            None => {
                scene.detach(part.node);
                state.unlink(slot);
                state.queue_pending(&site.parent_slot, slot);
                debug!("'{}' waits for '{}'", slot, site.parent_slot);
                Placement::Pending {
                    parent_slot: site.parent_slot,
                }
            }
        }
    };

    let attached = !matches!(placement, Placement::Pending { .. });
    if let Some(entry) = state.active_models.get_mut(slot) {
        entry.placement = placement;
    }
    attached
}

/// Attach everything that was waiting for `parent_slot`
pub(crate) fn flush_pending(
    catalog: &ItemStore,
    state: &mut CharacterState,
    scene: &mut SceneGraph,
    root: NodeId,
    parent_slot: &str,
) -> usize {
    let Some(waiting) = state.pending_attachments.remove(parent_slot) else {
        return 0;
    };
    waiting
        .iter()
        .filter(|child| place(catalog, state, scene, root, child))
        .count()
}

/// Drop `slot` and everything attached below it. Returns whether the slot was occupied.
pub(crate) fn remove_slot(state: &mut CharacterState, scene: &mut SceneGraph, slot: &str) -> bool {
    if !state.active_models.contains_key(slot) {
        return false;
    }
    for key in state.removal_order(slot) {
        if let Some(part) = state.active_models.remove(&key) {
            scene.remove_subtree(part.node);
            debug!("Removed '{}' from '{}'", part.item_id, key);
        }
        state.unlink(&key);
        state.dequeue_pending(&key);
    }
    true
}

/// Re-apply materials, colors and sockets from the catalog, re-place nested
/// parts, then refresh every part attached below.
pub(crate) fn refresh_slot(
    catalog: &ItemStore,
    state: &mut CharacterState,
    scene: &mut SceneGraph,
    root: NodeId,
    slot: &str,
) -> usize {
    let Some(part) = state.active_models.get(slot).cloned() else {
        return 0;
    };
    let Some(item) = catalog.get(&part.item_id) else {
        warn!("Cannot refresh '{}': item '{}' is not in the catalog", slot, part.item_id);
        return 0;
    };
    decorate(scene, part.node, item, state.colors);
    if matches!(part.placement, Placement::Nested { .. }) {
        place(catalog, state, scene, root, slot);
    }

    let children: Vec<String> = state
        .children_of
        .get(slot)
        .map(|c| c.iter().cloned().collect())
        .unwrap_or_default();
    1 + children
        .iter()
        .map(|child| refresh_slot(catalog, state, scene, root, child))
        .sum::<usize>()
}

pub(crate) fn register_part(state: &mut CharacterState, item_id: &str, slot: &str, built: &BuiltPart) {
    state.active_models.insert(
        slot.to_string(),
        EquippedPart {
            item_id: item_id.to_string(),
            slot_key: slot.to_string(),
            node: built.node,
            skinned: built.skinned,
            placement: Placement::Root,
        },
    );
}
