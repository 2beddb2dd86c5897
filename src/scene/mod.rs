//! Headless scene graph runtime
//!
//! Hierarchical transform nodes with metadata tags. The renderer is not part of
//! this crate; it reads the graph through the same API the character
//! controller writes it with.

pub mod graph;
pub mod transform;

pub use graph::{
    LocalTransform, MaterialBinding, MeshPrimitive, Node, NodeId, NodeKind, NodeMeta, SceneGraph,
    SceneHandle,
};
pub use transform::{apply_transform, euler_degrees_to_radians};
