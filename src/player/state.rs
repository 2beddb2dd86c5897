use crate::assets::{AnimationClip, Skeleton};
use crate::config::PlayerSettings;
use crate::scene::NodeId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Default parts and caller overrides are still being applied
    Initializing,
    Ready,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerColors {
    pub primary: [f32; 4],
    pub secondary: [f32; 4],
}

impl Default for PlayerColors {
    fn default() -> Self {
        Self::from(&PlayerSettings::default())
    }
}

impl From<&PlayerSettings> for PlayerColors {
    fn from(settings: &PlayerSettings) -> Self {
        Self {
            primary: settings.primary_color,
            secondary: settings.secondary_color,
        }
    }
}

/// How an equipped part is hooked into the character
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Directly under the character root
    Root,
    /// Under the part occupying `parent_slot`
    Nested { parent_slot: String },
    /// Loaded, waiting for `parent_slot` to be occupied
    Pending { parent_slot: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquippedPart {
    pub item_id: String,
    pub slot_key: String,
    pub node: NodeId,
    /// Holds skinned primitives that follow the shared skeleton
    pub skinned: bool,
    pub placement: Placement,
}

impl EquippedPart {
    pub fn is_pending(&self) -> bool {
        matches!(self.placement, Placement::Pending { .. })
    }
}

/// Everything one character owns
#[derive(Debug)]
pub struct CharacterState {
    pub phase: Phase,
    pub active_models: BTreeMap<String, EquippedPart>,
    /// Parent slot → child slots waiting for it
    pub pending_attachments: BTreeMap<String, Vec<String>>,
    /// Parent slot → child slots attached under it
    pub children_of: BTreeMap<String, BTreeSet<String>>,
    pub skeleton: Option<Arc<Skeleton>>,
    pub clips: Vec<AnimationClip>,
    pub colors: PlayerColors,
}

impl CharacterState {
    pub fn new(colors: PlayerColors) -> Self {
        Self {
            phase: Phase::Initializing,
            active_models: BTreeMap::new(),
            pending_attachments: BTreeMap::new(),
            children_of: BTreeMap::new(),
            skeleton: None,
            clips: Vec::new(),
            colors,
        }
    }

    /// Occupied slot keys strictly below `slot`, as (item, slot) pairs
    pub fn descendants_of(&self, slot: &str) -> Vec<(String, String)> {
        self.active_models
            .iter()
            .filter(|(key, _)| crate::attachment::is_descendant(key, slot))
            .map(|(key, part)| (part.item_id.clone(), key.clone()))
            .collect()
    }

    /// `slot` plus every slot transitively attached to it, children first
    pub fn removal_order(&self, slot: &str) -> Vec<String> {
        let mut order = Vec::new();
        self.collect_removal(slot, &mut order);
        order
    }

    fn collect_removal(&self, slot: &str, order: &mut Vec<String>) {
        if let Some(children) = self.children_of.get(slot) {
            for child in children {
                self.collect_removal(child, order);
            }
        }
        order.push(slot.to_string());
    }

    pub(crate) fn link(&mut self, parent_slot: &str, child_slot: &str) {
        self.children_of
            .entry(parent_slot.to_string())
            .or_default()
            .insert(child_slot.to_string());
    }

    pub(crate) fn unlink(&mut self, child_slot: &str) {
        self.children_of.retain(|_, children| {
            children.remove(child_slot);
            !children.is_empty()
        });
        self.children_of.remove(child_slot);
    }

    pub(crate) fn queue_pending(&mut self, parent_slot: &str, child_slot: &str) {
        let queue = self.pending_attachments.entry(parent_slot.to_string()).or_default();
        if !queue.iter().any(|s| s == child_slot) {
            queue.push(child_slot.to_string());
        }
    }

    pub(crate) fn dequeue_pending(&mut self, child_slot: &str) {
        self.pending_attachments.retain(|_, queue| {
            queue.retain(|s| s != child_slot);
            !queue.is_empty()
        });
    }
}
