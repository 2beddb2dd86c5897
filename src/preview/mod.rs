//! Preview combinations for browsing parent/child pairs
//!
//! Generated combinations are memoized per (selected item, edit mode). Every
//! entry records which catalog data it read, so an edit only drops the entries
//! that actually depended on it.

pub mod cache;

pub use cache::{DependencyKey, PreviewCache};

use crate::attachment::{attachment_site, expand_dual, resolve, ResolvedTransform};
use crate::catalog::{CatalogResult, ItemDefinition, ItemStore};
use std::collections::BTreeSet;

/// Which side of the pair the selected item is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditMode {
    /// Selected item is the parent; show every child that fits it
    Parent,
    /// Selected item is the child; show it on every compatible parent
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    pub item_id: String,
    pub mode: EditMode,
}

impl PreviewKey {
    pub fn new(item_id: impl Into<String>, mode: EditMode) -> Self {
        Self {
            item_id: item_id.into(),
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewCombination {
    pub display_name: String,
    pub parent_ref: String,
    pub child_ref: String,
    pub slot_key: String,
    pub transform: ResolvedTransform,
}

/// Slot a child type occupies for preview purposes; dual families show the left side
fn preview_slot(item: &ItemDefinition) -> String {
    match expand_dual(&item.item_type) {
        Some([left, _]) => left,
        None => item.item_type.clone(),
    }
}

fn combine(
    store: &ItemStore,
    parent_id: &str,
    parent: &ItemDefinition,
    child_id: &str,
    child: &ItemDefinition,
    deps: &mut BTreeSet<DependencyKey>,
) -> Option<PreviewCombination> {
    let slot_key = preview_slot(child);
    let site = attachment_site(&slot_key, child, store.base_slots())?;
    let transform = resolve(child, parent, parent_id, &site, store.fallbacks());
    deps.insert(DependencyKey::Item {
        id: child_id.to_string(),
        slot_path: site.slot_path.clone(),
    });
    deps.insert(DependencyKey::Item {
        id: parent_id.to_string(),
        slot_path: site.slot_path.clone(),
    });
    deps.insert(DependencyKey::Anchor {
        id: parent_id.to_string(),
        anchor: site.anchor.clone(),
    });
    deps.insert(DependencyKey::Override {
        child_id: child_id.to_string(),
        parent_id: parent_id.to_string(),
    });
    deps.insert(DependencyKey::Fallback {
        slot_path: site.slot_path,
    });
    Some(PreviewCombination {
        display_name: format!("{} on {}", child_id, parent_id),
        parent_ref: parent_id.to_string(),
        child_ref: child_id.to_string(),
        slot_key,
        transform,
    })
}

/// Every parent/child pairing for `selected` in `mode`, plus the data it read
pub fn build_combinations(
    store: &ItemStore,
    selected: &str,
    mode: EditMode,
) -> CatalogResult<(Vec<PreviewCombination>, BTreeSet<DependencyKey>)> {
    let item = store.require(selected)?;
    let base = item.base_type().to_string();

    let mut deps = BTreeSet::new();
    deps.insert(DependencyKey::Item {
        id: selected.to_string(),
        slot_path: item.item_type.clone(),
    });
    deps.insert(DependencyKey::Membership { base: base.clone() });

    let mut ids: Vec<&str> = store
        .iter()
        .filter(|(_, other)| other.base_type() == base)
        .map(|(id, _)| id)
        .collect();
    ids.sort_unstable();

    let mut combinations = Vec::new();
    for other_id in ids {
        let Some(other) = store.get(other_id) else {
            continue;
        };
        let combination = match mode {
            EditMode::Parent if !item.is_nested() && other.is_nested() => {
                combine(store, selected, item, other_id, other, &mut deps)
            }
            EditMode::Child if item.is_nested() && !other.is_nested() => {
                combine(store, other_id, other, selected, item, &mut deps)
            }
            _ => None,
        };
        combinations.extend(combination);
    }
    Ok((combinations, deps))
}
