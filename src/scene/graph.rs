use crate::materials::MaterialRole;
use glam::{EulerRot, Mat4, Quat, Vec3};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub type NodeId = u32;

/// Shared scene handle; the coordination thread is the only writer
pub type SceneHandle = Arc<Mutex<SceneGraph>>;

/// Local transform. Rotation is Euler radians applied yaw (Y), pitch (X), roll (Z).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl LocalTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn quaternion(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.rotation.y, self.rotation.x, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quaternion(), self.position)
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Role assignment and current color of a mesh primitive
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialBinding {
    pub role: Option<MaterialRole>,
    /// Position in the owning item's material list
    pub index: Option<usize>,
    /// Color the primitive was created with
    pub base_color: [f32; 4],
    /// Color currently applied
    pub color: [f32; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshPrimitive {
    pub mesh_id: u8,
    pub material_id: u8,
    /// Decode-order position of the material, if the container declared it
    pub material_position: Option<usize>,
    pub vertex_count: u32,
    pub index_count: usize,
    pub skinned: bool,
    /// Skeleton this primitive is bound to
    pub skeleton: Option<Uuid>,
    pub bounds: Option<(Vec3, Vec3)>,
    pub material: MaterialBinding,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(MeshPrimitive),
}

/// Metadata tags the character controller relies on
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeMeta {
    /// Catalog identifier of the item this node is the root of
    pub item_id: Option<String>,
    /// Slot the item occupies
    pub slot_key: Option<String>,
    pub player_root: bool,
    pub socket: bool,
    /// Nested attachment; recoloring a parent must stop here
    pub sub_item: bool,
    pub extra: BTreeMap<String, String>,
}

impl NodeMeta {
    pub fn is_item(&self) -> bool {
        self.item_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: LocalTransform,
    pub kind: NodeKind,
    pub meta: NodeMeta,
}

impl Node {
    pub fn mesh(&self) -> Option<&MeshPrimitive> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut MeshPrimitive> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }
}

/// Arena of nodes with explicit parent/child links
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HashMap<NodeId, Node>,
    next_id: NodeId,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_handle(self) -> SceneHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn create_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                name: name.into(),
                parent: None,
                children: Vec::new(),
                transform: LocalTransform::IDENTITY,
                kind,
                meta: NodeMeta::default(),
            },
        );
        id
    }

    pub fn create_group(&mut self, name: impl Into<String>) -> NodeId {
        self.create_node(name, NodeKind::Group)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Attach `child` as the last child of `parent`. The local transform is kept as is.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> bool {
        let index = self.children(parent).len();
        self.attach_at(parent, child, index)
    }

    pub fn attach_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> bool {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return false;
        }
        if self.is_ancestor(child, parent) {
            return false;
        }
        self.detach(child);
        if let Some(p) = self.nodes.get_mut(&parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        true
    }

    /// Unlink a node from its parent; the node and its subtree stay alive
    pub fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(&child)?.parent.take()?;
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|&c| c != child);
        }
        Some(parent)
    }

    /// Detach and drop a node with its whole subtree
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        self.detach(id);
        let doomed = self.traverse(id);
        for node in &doomed {
            self.nodes.remove(node);
        }
        doomed.len()
    }

    /// Pre-order traversal starting at (and including) `root`
    pub fn traverse(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Pre-order traversal that does not descend into nodes rejected by `enter`.
    /// The root is always visited.
    pub fn traverse_filtered<F>(&self, root: NodeId, enter: F) -> Vec<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.children(id).iter().rev() {
                if self.nodes.get(&child).map(|n| enter(n)).unwrap_or(false) {
                    stack.push(child);
                }
            }
        }
        out
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn find_child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.nodes.get(&c).map(|n| n.name == name).unwrap_or(false))
    }

    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.nodes.get(&node_id) {
                Some(node) => {
                    matrix = node.transform.matrix() * matrix;
                    current = node.parent;
                }
                None => break,
            }
        }
        matrix
    }

    /// World-space bounding box of every mesh in the subtree
    pub fn bounding_box(&self, root: NodeId) -> Option<(Vec3, Vec3)> {
        let mut result: Option<(Vec3, Vec3)> = None;
        for id in self.traverse(root) {
            let Some((min, max)) = self.nodes.get(&id).and_then(|n| n.mesh()).and_then(|m| m.bounds) else {
                continue;
            };
            let world = self.world_matrix(id);
            for corner in 0..8 {
                let local = Vec3::new(
                    if corner & 1 == 0 { min.x } else { max.x },
                    if corner & 2 == 0 { min.y } else { max.y },
                    if corner & 4 == 0 { min.z } else { max.z },
                );
                let p = world.transform_point3(local);
                result = Some(match result {
                    Some((lo, hi)) => (lo.min(p), hi.max(p)),
                    None => (p, p),
                });
            }
        }
        result
    }

    /// Bind every skinned primitive under `root` to `skeleton`
    pub fn bind_skeleton(&mut self, root: NodeId, skeleton: Uuid) -> usize {
        let mut bound = 0;
        for id in self.traverse(root) {
            if let Some(mesh) = self.nodes.get_mut(&id).and_then(Node::mesh_mut) {
                if mesh.skinned {
                    mesh.skeleton = Some(skeleton);
                    bound += 1;
                }
            }
        }
        bound
    }

    /// Swap `old` for `new` at the same position in the parent's child list.
    /// `old`'s children move to `new`; `old` itself is dropped.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) -> bool {
        if !self.contains(old) || !self.contains(new) || old == new {
            return false;
        }
        let children: Vec<NodeId> = self.children(old).to_vec();
        for child in children {
            self.attach(new, child);
        }
        if let (Some(parent), Some(index)) = (self.parent(old), self.index_in_parent(old)) {
            self.detach(old);
            self.attach_at(parent, new, index);
        }
        self.nodes.remove(&old);
        true
    }
}
