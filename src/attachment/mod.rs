//! Slot paths and attachment transform resolution

pub mod resolver;
pub mod slot;

pub use resolver::{
    commit_anchor_edit, resolve, resolve_for_slot, AnchorDestination, AnchorEdit, FieldSources,
    ResolvedTransform, TransformSource,
};
pub use slot::{attachment_site, expand_dual, is_descendant, AttachmentSite, BaseSlots};
