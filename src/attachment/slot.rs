//! Slot path conventions
//!
//! A slot key is a slash-delimited path. Its base slot is the first segment,
//! or the first two for the dual families (`hand/left`, `rope/right`). Anything
//! after the base names an attachment on the base part.

use crate::catalog::ItemDefinition;
use std::collections::BTreeSet;

/// Fixed base types that attach under the character root
pub const ROOT_BASES: [&str; 5] = ["head", "body", "hand", "rope", "checkpoint"];

/// Base types that always occupy a left and a right slot
pub const DUAL_FAMILIES: [&str; 2] = ["hand", "rope"];

pub const SIDES: [&str; 2] = ["left", "right"];

pub const CHECKPOINT: &str = "checkpoint";

pub const ROPE: &str = "rope";

/// Synthetic anchor every rope attachment hangs from
pub const ROPE_END_ANCHOR: &str = "end";

/// Fixed and dynamically registered base types
#[derive(Debug, Clone, Default)]
pub struct BaseSlots {
    custom: BTreeSet<String>,
}

impl BaseSlots {
    pub fn register(&mut self, name: &str) -> bool {
        if ROOT_BASES.contains(&name) {
            return false;
        }
        self.custom.insert(name.to_string())
    }

    pub fn custom(&self) -> impl Iterator<Item = &str> {
        self.custom.iter().map(String::as_str)
    }

    /// Whether `segment` names a base type
    pub fn is_base_type(&self, segment: &str) -> bool {
        ROOT_BASES.contains(&segment) || self.custom.contains(segment)
    }

    /// Concrete base slot a key belongs to; `None` for unknown bases and
    /// for dual families without a side
    pub fn base_of(&self, key: &str) -> Option<String> {
        let mut segments = key.split('/');
        let first = segments.next()?;
        if !self.is_base_type(first) {
            return None;
        }
        if is_dual_family(first) {
            let side = segments.next()?;
            if !SIDES.contains(&side) {
                return None;
            }
            return Some(format!("{}/{}", first, side));
        }
        Some(first.to_string())
    }

    pub fn is_root_slot(&self, key: &str) -> bool {
        self.base_of(key).as_deref() == Some(key)
    }
}

pub fn is_dual_family(base: &str) -> bool {
    DUAL_FAMILIES.contains(&base)
}

/// Split a request on a dual family into its left and right keys.
/// `hand` becomes `hand/left` + `hand/right`; `hand/watch` becomes
/// `hand/left/watch` + `hand/right/watch`. Keys that already name a side
/// are returned as `None`.
pub fn expand_dual(key: &str) -> Option<[String; 2]> {
    let (first, rest) = match key.split_once('/') {
        Some((first, rest)) => (first, Some(rest)),
        None => (key, None),
    };
    if !is_dual_family(first) {
        return None;
    }
    if let Some(rest) = rest {
        let second = rest.split('/').next().unwrap_or_default();
        if SIDES.contains(&second) {
            return None;
        }
    }
    let sided = |side: &str| match rest {
        Some(rest) => format!("{}/{}/{}", first, side, rest),
        None => format!("{}/{}", first, side),
    };
    Some([sided(SIDES[0]), sided(SIDES[1])])
}

/// `candidate` sits strictly below `slot`
pub fn is_descendant(candidate: &str, slot: &str) -> bool {
    candidate.len() > slot.len()
        && candidate.starts_with(slot)
        && candidate.as_bytes()[slot.len()] == b'/'
}

/// Where a nested slot attaches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSite {
    /// Slot key of the part the child attaches to
    pub parent_slot: String,
    /// Key into the parent's `attachment_points`
    pub anchor: String,
    /// Key into the fallback and default tables
    pub slot_path: String,
}

/// Attachment site for `key`, or `None` when `key` is a root slot or has no known base
pub fn attachment_site(key: &str, child: &ItemDefinition, bases: &BaseSlots) -> Option<AttachmentSite> {
    let base = bases.base_of(key)?;
    if base == key {
        return None;
    }
    let remainder = &key[base.len() + 1..];
    if base.split('/').next() == Some(ROPE) {
        return Some(AttachmentSite {
            slot_path: format!("{}/{}", base, ROPE_END_ANCHOR),
            parent_slot: base,
            anchor: ROPE_END_ANCHOR.to_string(),
        });
    }
    let anchor = child
        .attachment_point
        .clone()
        .unwrap_or_else(|| remainder.to_string());
    Some(AttachmentSite {
        parent_slot: base,
        anchor,
        slot_path: key.to_string(),
    })
}
