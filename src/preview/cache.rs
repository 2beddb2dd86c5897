use super::{build_combinations, EditMode, PreviewCombination, PreviewKey};
use crate::attachment::AnchorDestination;
use crate::catalog::{CatalogResult, ChangeSet, ItemStore};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A piece of catalog data a preview entry was built from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyKey {
    /// An item's data as read for one slot path
    Item { id: String, slot_path: String },
    /// One named entry of a parent's `attachment_points`
    Anchor { id: String, anchor: String },
    /// A child's override for one parent
    Override { child_id: String, parent_id: String },
    /// A global fallback table entry
    Fallback { slot_path: String },
    /// The set of catalog items under a base type
    Membership { base: String },
}

/// Memoized combinations with a reverse index from dependency to cache keys
#[derive(Debug, Default)]
pub struct PreviewCache {
    entries: HashMap<PreviewKey, Arc<Vec<PreviewCombination>>>,
    dependents: HashMap<DependencyKey, HashSet<PreviewKey>>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &PreviewKey) -> Option<Arc<Vec<PreviewCombination>>> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &PreviewKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(
        &mut self,
        key: PreviewKey,
        combinations: Vec<PreviewCombination>,
        dependencies: impl IntoIterator<Item = DependencyKey>,
    ) -> Arc<Vec<PreviewCombination>> {
        self.remove(&key);
        for dep in dependencies {
            self.dependents.entry(dep).or_default().insert(key.clone());
        }
        let combinations = Arc::new(combinations);
        self.entries.insert(key, Arc::clone(&combinations));
        combinations
    }

    pub fn remove(&mut self, key: &PreviewKey) -> bool {
        if self.entries.remove(key).is_none() {
            return false;
        }
        self.dependents.retain(|_, keys| {
            keys.remove(key);
            !keys.is_empty()
        });
        true
    }

    /// Drop every entry that read `dep`
    pub fn invalidate(&mut self, dep: &DependencyKey) -> usize {
        let Some(keys) = self.dependents.remove(dep) else {
            return 0;
        };
        let dropped = keys.iter().filter(|key| self.remove(key)).count();
        debug!("Preview invalidation {:?} dropped {} entries", dep, dropped);
        dropped
    }

    fn invalidate_all(&mut self, deps: &[DependencyKey]) -> usize {
        deps.iter().map(|dep| self.invalidate(dep)).sum()
    }

    /// Drop every entry that read any data of item `id`
    pub fn invalidate_item(&mut self, id: &str) -> usize {
        let deps: Vec<DependencyKey> = self
            .dependents
            .keys()
            .filter(|dep| match dep {
                DependencyKey::Item { id: dep_id, .. } | DependencyKey::Anchor { id: dep_id, .. } => dep_id == id,
                DependencyKey::Override { child_id, .. } => child_id == id,
                _ => false,
            })
            .cloned()
            .collect();
        self.invalidate_all(&deps)
    }

    /// Drop entries affected by a catalog edit
    pub fn invalidate_change_set(&mut self, changes: &ChangeSet) -> usize {
        if changes.is_empty() {
            return 0;
        }
        let mut deps: Vec<DependencyKey> = changes
            .anchors_touched
            .iter()
            .map(|anchor| DependencyKey::Anchor {
                id: changes.id.clone(),
                anchor: anchor.clone(),
            })
            .collect();
        deps.extend(changes.overrides_touched.iter().map(|parent_id| DependencyKey::Override {
            child_id: changes.id.clone(),
            parent_id: parent_id.clone(),
        }));
        let mut dropped = self.invalidate_all(&deps);
        dropped += self.invalidate_item(&changes.id);
        if changes.touches("type") {
            let membership: Vec<DependencyKey> = self
                .dependents
                .keys()
                .filter(|dep| matches!(dep, DependencyKey::Membership { .. }))
                .cloned()
                .collect();
            dropped += self.invalidate_all(&membership);
        }
        dropped
    }

    /// Drop entries affected by an anchor edit
    pub fn invalidate_destination(&mut self, destination: &AnchorDestination) -> usize {
        let deps = match destination {
            AnchorDestination::Override {
                child_id,
                parent_id,
                slot_path,
            } => vec![
                DependencyKey::Override {
                    child_id: child_id.clone(),
                    parent_id: parent_id.clone(),
                },
                DependencyKey::Item {
                    id: child_id.clone(),
                    slot_path: slot_path.clone(),
                },
            ],
            AnchorDestination::ParentAnchor {
                parent_id,
                anchor,
                slot_path,
            } => vec![
                DependencyKey::Anchor {
                    id: parent_id.clone(),
                    anchor: anchor.clone(),
                },
                DependencyKey::Item {
                    id: parent_id.clone(),
                    slot_path: slot_path.clone(),
                },
            ],
            AnchorDestination::GlobalFallback { slot_path } => vec![DependencyKey::Fallback {
                slot_path: slot_path.clone(),
            }],
        };
        self.invalidate_all(&deps)
    }

    /// An item of `base` was added to or removed from the catalog
    pub fn invalidate_membership(&mut self, base: &str) -> usize {
        self.invalidate(&DependencyKey::Membership {
            base: base.to_string(),
        })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dependents.clear();
    }

    /// Cached combinations for `selected`, building them on a miss
    pub fn get_or_build(
        &mut self,
        store: &ItemStore,
        selected: &str,
        mode: EditMode,
    ) -> CatalogResult<Arc<Vec<PreviewCombination>>> {
        let key = PreviewKey::new(selected, mode);
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let (combinations, deps) = build_combinations(store, selected, mode)?;
        Ok(self.insert(key, combinations, deps))
    }
}
