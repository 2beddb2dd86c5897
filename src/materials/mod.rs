//! Color and material binding
//!
//! Material roles are matched to mesh primitives by position. Recoloring a part
//! never crosses into a nested attachment: traversal stops at any node tagged
//! as a sub-item.

use crate::catalog::ItemDefinition;
use crate::scene::{NodeId, SceneGraph};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Alpha used for visor-tinted materials
pub const VISOR_ALPHA: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialRole {
    Primary,
    Secondary,
    PrimaryDark,
    SecondaryDark,
    #[serde(alias = "visor-tinted", alias = "visor_tinted")]
    Visor,
    /// Only the literal color applies
    Literal,
    /// Keep the original material
    #[default]
    Default,
}

fn darken(rgba: [f32; 4]) -> [f32; 4] {
    [rgba[0] * 0.5, rgba[1] * 0.5, rgba[2] * 0.5, rgba[3]]
}

impl MaterialRole {
    /// Concrete color for this role; `None` means the original material stays
    pub fn resolve(self, primary: [f32; 4], secondary: [f32; 4], literal: Option<[f32; 4]>) -> Option<[f32; 4]> {
        if let Some(color) = literal {
            return Some(color);
        }
        match self {
            MaterialRole::Primary => Some(primary),
            MaterialRole::Secondary => Some(secondary),
            MaterialRole::PrimaryDark => Some(darken(primary)),
            MaterialRole::SecondaryDark => Some(darken(secondary)),
            MaterialRole::Visor => Some([secondary[0], secondary[1], secondary[2], VISOR_ALPHA]),
            MaterialRole::Literal | MaterialRole::Default => None,
        }
    }
}

/// Mesh nodes owned by `part`, in traversal order, excluding nested attachments
fn owned_meshes(scene: &SceneGraph, part: NodeId) -> Vec<NodeId> {
    scene
        .traverse_filtered(part, |node| !node.meta.sub_item)
        .into_iter()
        .filter(|&id| scene.get(id).and_then(|n| n.mesh()).is_some())
        .collect()
}

/// Tag each owned primitive with its material role and position.
/// Returns the number of primitives that received a role.
pub fn apply_material_indices(scene: &mut SceneGraph, part: NodeId, item: &ItemDefinition) -> usize {
    let mut assigned = 0;
    for (ordinal, id) in owned_meshes(scene, part).into_iter().enumerate() {
        let Some(mesh) = scene.get_mut(id).and_then(|n| n.mesh_mut()) else {
            continue;
        };
        let index = mesh.material_position.unwrap_or(ordinal);
        mesh.material.index = Some(index);
        mesh.material.role = item.materials.get(index).map(|slot| slot.role);
        if mesh.material.role.is_some() {
            assigned += 1;
        }
    }
    debug!("Assigned {} material roles for '{}'", assigned, item.item_type);
    assigned
}

/// Recolor every role-tagged primitive owned by `part`.
/// Primitives whose role yields no color revert to their original material.
pub fn apply_player_colors(
    scene: &mut SceneGraph,
    part: NodeId,
    item: &ItemDefinition,
    primary: [f32; 4],
    secondary: [f32; 4],
) -> usize {
    let mut recolored = 0;
    for id in owned_meshes(scene, part) {
        let Some(mesh) = scene.get_mut(id).and_then(|n| n.mesh_mut()) else {
            continue;
        };
        let (Some(role), Some(index)) = (mesh.material.role, mesh.material.index) else {
            continue;
        };
        let literal = item.materials.get(index).and_then(|slot| slot.literal_color);
        match role.resolve(primary, secondary, literal) {
            Some(color) => {
                mesh.material.color = color;
                recolored += 1;
            }
            None => mesh.material.color = mesh.material.base_color,
        }
    }
    recolored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MaterialSlot;
    use crate::scene::{MaterialBinding, MeshPrimitive, NodeKind};

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
    const GREY: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

    fn primitive(position: Option<usize>) -> NodeKind {
        NodeKind::Mesh(MeshPrimitive {
            mesh_id: 0,
            material_id: 0,
            material_position: position,
            vertex_count: 3,
            index_count: 3,
            skinned: false,
            skeleton: None,
            bounds: None,
            material: MaterialBinding {
                base_color: GREY,
                color: GREY,
                ..Default::default()
            },
        })
    }

    fn color_of(scene: &SceneGraph, id: NodeId) -> [f32; 4] {
        scene.get(id).unwrap().mesh().unwrap().material.color
    }

    #[test]
    fn test_role_resolution() {
        assert_eq!(MaterialRole::Primary.resolve(RED, BLUE, None), Some(RED));
        assert_eq!(
            MaterialRole::PrimaryDark.resolve(RED, BLUE, None),
            Some([0.5, 0.0, 0.0, 1.0])
        );
        assert_eq!(
            MaterialRole::Visor.resolve(RED, BLUE, None),
            Some([0.0, 0.0, 1.0, VISOR_ALPHA])
        );
        assert_eq!(MaterialRole::Default.resolve(RED, BLUE, None), None);
        assert_eq!(MaterialRole::Secondary.resolve(RED, BLUE, Some(GREY)), Some(GREY));
    }

    #[test]
    fn test_role_names_parse() {
        let role: MaterialRole = serde_json::from_str("\"visor-tinted\"").unwrap();
        assert_eq!(role, MaterialRole::Visor);
        let role: MaterialRole = serde_json::from_str("\"secondary_dark\"").unwrap();
        assert_eq!(role, MaterialRole::SecondaryDark);
    }

    #[test]
    fn test_recolor_stops_at_sub_item() {
        let mut scene = SceneGraph::new();
        let part = scene.create_group("head");
        let own = scene.create_node("head_mesh", primitive(Some(0)));
        scene.attach(part, own);

        let hat = scene.create_group("hat");
        scene.get_mut(hat).unwrap().meta.sub_item = true;
        let hat_mesh = scene.create_node("hat_mesh", primitive(Some(0)));
        scene.attach(hat, hat_mesh);
        scene.attach(part, hat);

        let hat_item = ItemDefinition::new("head/hat").with_material(MaterialSlot::role(MaterialRole::Secondary));
        apply_material_indices(&mut scene, hat, &hat_item);
        apply_player_colors(&mut scene, hat, &hat_item, RED, BLUE);
        assert_eq!(color_of(&scene, hat_mesh), BLUE);

        let head_item = ItemDefinition::new("head").with_material(MaterialSlot::role(MaterialRole::Primary));
        assert_eq!(apply_material_indices(&mut scene, part, &head_item), 1);
        assert_eq!(apply_player_colors(&mut scene, part, &head_item, GREY, GREY), 1);
        apply_player_colors(&mut scene, part, &head_item, RED, RED);
        assert_eq!(color_of(&scene, own), RED);
        assert_eq!(color_of(&scene, hat_mesh), BLUE);
    }

    #[test]
    fn test_undefined_color_reverts() {
        let mut scene = SceneGraph::new();
        let part = scene.create_group("body");
        let first = scene.create_node("a", primitive(None));
        let second = scene.create_node("b", primitive(None));
        scene.attach(part, first);
        scene.attach(part, second);
        let item = ItemDefinition::new("body")
            .with_material(MaterialSlot::role(MaterialRole::Primary))
            .with_material(MaterialSlot::role(MaterialRole::Default));

        apply_material_indices(&mut scene, part, &item);
        scene.get_mut(second).unwrap().mesh_mut().unwrap().material.color = RED;
        apply_player_colors(&mut scene, part, &item, BLUE, BLUE);
        assert_eq!(color_of(&scene, first), BLUE);
        assert_eq!(color_of(&scene, second), GREY);
    }
}
