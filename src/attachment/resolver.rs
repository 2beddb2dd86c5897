//! Attachment transform resolution
//!
//! Each transform field is taken from the first layer that defines it:
//! the child's override for this parent, the parent's anchor, the global
//! fallback table, the hardcoded defaults. Fields nobody defines fall back to
//! the identity.

use super::slot::{attachment_site, AttachmentSite};
use crate::catalog::{
    default_transform, CatalogError, CatalogResult, ItemDefinition, ItemOrigin, ItemStore, Scale,
    TransformRecord,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Layer a resolved field came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformSource {
    Override,
    ParentAnchor,
    GlobalFallback,
    Default,
    Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSources {
    pub position: TransformSource,
    pub rotation: TransformSource,
    pub scale: TransformSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTransform {
    pub position: [f32; 3],
    /// Degrees
    pub rotation: [f32; 3],
    /// Kept in whichever form the winning layer authored it
    pub scale: Scale,
    pub sources: FieldSources,
}

impl ResolvedTransform {
    pub fn to_record(&self) -> TransformRecord {
        TransformRecord {
            position: Some(self.position),
            rotation: Some(self.rotation),
            scale: Some(self.scale),
        }
    }
}

fn pick<T: Copy>(
    layers: &[(TransformSource, Option<&TransformRecord>)],
    field: impl Fn(&TransformRecord) -> Option<T>,
    identity: T,
) -> (T, TransformSource) {
    layers
        .iter()
        .find_map(|(source, record)| record.and_then(|r| field(r)).map(|v| (v, *source)))
        .unwrap_or((identity, TransformSource::Identity))
}

/// Final local transform for `child` attached to the part `parent_id` at `site`
pub fn resolve(
    child: &ItemDefinition,
    parent: &ItemDefinition,
    parent_id: &str,
    site: &AttachmentSite,
    fallbacks: &BTreeMap<String, TransformRecord>,
) -> ResolvedTransform {
    let hardcoded = default_transform(&site.slot_path);
    let layers = [
        (
            TransformSource::Override,
            child.attachment_point_overrides.get(parent_id),
        ),
        (
            TransformSource::ParentAnchor,
            parent.attachment_points.get(&site.anchor),
        ),
        (
            TransformSource::GlobalFallback,
            fallbacks.get(&site.slot_path),
        ),
        (TransformSource::Default, hardcoded.as_ref()),
    ];

    let (position, position_source) = pick(&layers, |r| r.position, [0.0; 3]);
    let (rotation, rotation_source) = pick(&layers, |r| r.rotation, [0.0; 3]);
    let (scale, scale_source) = pick(&layers, |r| r.scale, Scale::Uniform(1.0));

    ResolvedTransform {
        position,
        rotation,
        scale,
        sources: FieldSources {
            position: position_source,
            rotation: rotation_source,
            scale: scale_source,
        },
    }
}

/// Resolve by identifiers against the store. `None` when `slot_key` is a root slot.
pub fn resolve_for_slot(
    store: &ItemStore,
    child_id: &str,
    parent_id: &str,
    slot_key: &str,
) -> CatalogResult<Option<ResolvedTransform>> {
    let child = store.require(child_id)?;
    let parent = store.require(parent_id)?;
    let Some(site) = attachment_site(slot_key, child, store.base_slots()) else {
        return Ok(None);
    };
    Ok(Some(resolve(child, parent, parent_id, &site, store.fallbacks())))
}

/// A transform produced by dragging a child into place
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorEdit {
    pub child_id: String,
    pub parent_id: String,
    pub slot_key: String,
    pub transform: TransformRecord,
    /// Store as an override for this parent only
    pub parent_specific: bool,
}

/// Where an anchor edit was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorDestination {
    Override {
        child_id: String,
        parent_id: String,
        slot_path: String,
    },
    ParentAnchor {
        parent_id: String,
        anchor: String,
        slot_path: String,
    },
    GlobalFallback {
        slot_path: String,
    },
}

/// Write an edited attachment transform back into the catalog.
///
/// Parent-specific edits become child overrides. Otherwise a custom parent
/// stores the anchor on itself, and a stock parent updates the global fallback
/// table so every stock-based character picks it up.
pub fn commit_anchor_edit(store: &mut ItemStore, edit: AnchorEdit) -> CatalogResult<AnchorDestination> {
    let child = store.require(&edit.child_id)?;
    let parent_origin = store
        .origin(&edit.parent_id)
        .ok_or_else(|| CatalogError::UnknownItem {
            id: edit.parent_id.clone(),
        })?;
    let site = attachment_site(&edit.slot_key, child, store.base_slots()).ok_or_else(|| {
        CatalogError::InvalidRecord {
            id: edit.child_id.clone(),
            reason: format!("'{}' is not an attachment slot", edit.slot_key),
        }
    })?;

    let destination = if edit.parent_specific {
        store.set_override(&edit.child_id, &edit.parent_id, edit.transform)?;
        AnchorDestination::Override {
            child_id: edit.child_id,
            parent_id: edit.parent_id,
            slot_path: site.slot_path,
        }
    } else {
        match parent_origin {
            ItemOrigin::Custom => {
                store.set_anchor(&edit.parent_id, &site.anchor, edit.transform)?;
                AnchorDestination::ParentAnchor {
                    parent_id: edit.parent_id,
                    anchor: site.anchor,
                    slot_path: site.slot_path,
                }
            }
            ItemOrigin::Stock => {
                store.set_fallback(site.slot_path.clone(), edit.transform);
                AnchorDestination::GlobalFallback {
                    slot_path: site.slot_path,
                }
            }
        }
    };
    info!("📋 Anchor edit stored: {:?}", destination);
    debug!("Catalog revision now {}", store.revision());
    Ok(destination)
}
