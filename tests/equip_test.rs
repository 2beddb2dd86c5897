mod common;

use common::*;
use glam::Vec3;
use outfit_forge::assets::MemoryTransport;
use outfit_forge::catalog::{CatalogHandle, ItemDefinition, ItemStore, MaterialSlot, TransformRecord};
use outfit_forge::materials::{apply_player_colors, MaterialRole};
use outfit_forge::player::{Character, Phase, Placement, PlayerColors, PlayerError};
use outfit_forge::scene::{NodeId, SceneGraph, SceneHandle};
use std::sync::Arc;

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

fn catalog() -> ItemStore {
    let mut store = ItemStore::with_defaults();
    store
        .register(
            "head_a",
            ItemDefinition::new("head")
                .with_file("head_a")
                .with_material(MaterialSlot::role(MaterialRole::Primary))
                .with_anchor("hat", TransformRecord::at([0.0, 0.5, 0.0])),
        )
        .unwrap();
    store
        .register(
            "head_b",
            ItemDefinition::new("head")
                .with_file("head_b")
                .with_material(MaterialSlot::role(MaterialRole::Primary))
                .with_anchor("hat", TransformRecord::at([0.0, 0.8, 0.0])),
        )
        .unwrap();
    for hat in ["hat_a", "hat_b"] {
        store
            .register(
                hat,
                ItemDefinition::new("head/hat")
                    .with_file(hat)
                    .with_material(MaterialSlot::role(MaterialRole::Secondary)),
            )
            .unwrap();
    }
    store
}

struct Fixture {
    character: Character,
    catalog: CatalogHandle,
    scene: SceneHandle,
    transport: Arc<MemoryTransport>,
}

async fn fixture() -> Fixture {
    let transport = Arc::new(MemoryTransport::new());
    for name in ["head", "body", "hand", "rope", "head_a", "head_b", "hat_a", "hat_b"] {
        transport.insert(mesh_url(name), triangle_part());
    }
    let catalog = catalog().into_handle();
    let scene = SceneGraph::new().into_handle();
    let character = Character::new(
        Arc::clone(&catalog),
        Arc::clone(&scene),
        memory_loader(Arc::clone(&transport)),
        PlayerColors {
            primary: RED,
            secondary: BLUE,
        },
    )
    .await;
    Fixture {
        character,
        catalog,
        scene,
        transport,
    }
}

async fn node_of(character: &Character, slot: &str) -> NodeId {
    character.equipped(slot).await.expect("slot occupied").node
}

fn first_mesh(scene: &SceneGraph, part: NodeId) -> NodeId {
    scene.children(part)[0]
}

#[tokio::test]
async fn test_equip_is_exclusive_per_slot() {
    let f = fixture().await;
    f.character.equip("head_a", "head").await.unwrap();
    f.character.equip("hat_a", "head/hat").await.unwrap();
    f.character.equip("hat_b", "head/hat").await.unwrap();

    let active = f.character.active_models().await;
    assert_eq!(active.get("head/hat").map(String::as_str), Some("hat_b"));

    let head = node_of(&f.character, "head").await;
    let scene = f.scene.lock().await;
    let hats = scene
        .traverse(head)
        .into_iter()
        .filter(|&id| scene.get(id).unwrap().meta.slot_key.as_deref() == Some("head/hat"))
        .count();
    assert_eq!(hats, 1);
}

#[tokio::test]
async fn test_base_swap_reparents_children() {
    let f = fixture().await;
    f.character.equip("head_a", "head").await.unwrap();
    f.character.equip("hat_a", "head/hat").await.unwrap();

    f.character.equip("head_b", "head").await.unwrap();

    let hat = f.character.equipped("head/hat").await.expect("hat survives the swap");
    assert_eq!(hat.item_id, "hat_a");
    assert_eq!(
        hat.placement,
        Placement::Nested {
            parent_slot: "head".to_string()
        }
    );
    let head = node_of(&f.character, "head").await;
    let scene = f.scene.lock().await;
    assert_eq!(scene.parent(hat.node), Some(head));
    assert_eq!(scene.get(head).unwrap().meta.item_id.as_deref(), Some("head_b"));
    assert_eq!(scene.get(hat.node).unwrap().transform.position, Vec3::new(0.0, 0.8, 0.0));
}

#[tokio::test]
async fn test_pending_attachment_resolves_when_parent_arrives() {
    let f = fixture().await;
    f.character.equip("hat_a", "head/hat").await.unwrap();

    let pending = f.character.pending_attachments().await;
    assert_eq!(pending.get("head"), Some(&vec!["head/hat".to_string()]));
    assert!(f.character.equipped("head/hat").await.unwrap().placement
        == Placement::Pending {
            parent_slot: "head".to_string()
        });

    f.character.equip("head_a", "head").await.unwrap();

    assert!(f.character.pending_attachments().await.is_empty());
    let hat = f.character.equipped("head/hat").await.unwrap();
    let head = node_of(&f.character, "head").await;
    let scene = f.scene.lock().await;
    assert_eq!(scene.parent(hat.node), Some(head));
    assert_eq!(scene.get(hat.node).unwrap().transform.position, Vec3::new(0.0, 0.5, 0.0));
}

#[tokio::test]
async fn test_recolor_does_not_cross_into_children() {
    let f = fixture().await;
    f.character.equip("head_a", "head").await.unwrap();
    f.character.equip("hat_a", "head/hat").await.unwrap();

    let head = node_of(&f.character, "head").await;
    let hat = node_of(&f.character, "head/hat").await;
    let head_item = f.catalog.read().await.get("head_a").cloned().unwrap();

    let mut scene = f.scene.lock().await;
    let head_mesh = first_mesh(&scene, head);
    let hat_mesh = first_mesh(&scene, hat);
    assert_eq!(scene.get(hat_mesh).unwrap().mesh().unwrap().material.color, BLUE);

    apply_player_colors(&mut scene, head, &head_item, GREEN, GREEN);
    assert_eq!(scene.get(head_mesh).unwrap().mesh().unwrap().material.color, GREEN);
    assert_eq!(scene.get(hat_mesh).unwrap().mesh().unwrap().material.color, BLUE);
}

#[tokio::test]
async fn test_set_colors_recolors_every_part_by_role() {
    let f = fixture().await;
    f.character.equip("head_a", "head").await.unwrap();
    f.character.equip("hat_a", "head/hat").await.unwrap();
    f.character
        .set_colors(PlayerColors {
            primary: GREEN,
            secondary: RED,
        })
        .await;

    let head = node_of(&f.character, "head").await;
    let hat = node_of(&f.character, "head/hat").await;
    let scene = f.scene.lock().await;
    let color = |part| scene.get(first_mesh(&scene, part)).unwrap().mesh().unwrap().material.color;
    assert_eq!(color(head), GREEN);
    assert_eq!(color(hat), RED);
}

#[tokio::test]
async fn test_missing_item_and_unknown_slot_are_errors() {
    let f = fixture().await;
    assert_eq!(
        f.character.equip("nope", "head").await,
        Err(PlayerError::MissingItem { id: "nope".to_string() })
    );
    assert_eq!(
        f.character.equip("hat_a", "tail/hat").await,
        Err(PlayerError::UnknownSlot {
            slot: "tail/hat".to_string()
        })
    );
    assert!(f.character.active_models().await.is_empty());
}

#[tokio::test]
async fn test_missing_asset_degrades_to_empty_part() {
    let f = fixture().await;
    f.transport.remove(&mesh_url("head_a"));
    f.character.equip("head_a", "head").await.unwrap();

    let head = node_of(&f.character, "head").await;
    let scene = f.scene.lock().await;
    assert!(scene.get(head).unwrap().meta.is_item());
    assert!(scene.children(head).iter().all(|&c| scene.get(c).unwrap().mesh().is_none()));
}

#[tokio::test]
async fn test_dual_family_fans_out() {
    let f = fixture().await;
    f.character.equip("hand", "hand").await.unwrap();
    let active = f.character.active_models().await;
    assert_eq!(active.get("hand/left").map(String::as_str), Some("hand"));
    assert_eq!(active.get("hand/right").map(String::as_str), Some("hand"));

    assert!(f.character.unequip("hand").await.unwrap());
    assert!(f.character.active_models().await.is_empty());
}

#[tokio::test]
async fn test_unequip_cascades_to_attached_parts() {
    let f = fixture().await;
    f.character.equip("head_a", "head").await.unwrap();
    f.character.equip("hat_a", "head/hat").await.unwrap();
    let hat = node_of(&f.character, "head/hat").await;

    assert!(f.character.unequip("head").await.unwrap());
    assert!(f.character.equipped("head/hat").await.is_none());
    assert!(!f.scene.lock().await.contains(hat));
    assert!(!f.character.unequip("head").await.unwrap());
}

#[tokio::test]
async fn test_refresh_applies_catalog_edits() {
    let f = fixture().await;
    f.character.equip("head_a", "head").await.unwrap();
    f.character.equip("hat_a", "head/hat").await.unwrap();

    f.catalog
        .write()
        .await
        .merge_document(
            "head_a",
            r#"{
                "type": "head",
                "file": "head_a",
                "materials": [{ "role": "primary" }],
                "attachment_points": { "hat": { "position": [0.0, 1.5, 0.0] } }
            }"#,
        )
        .unwrap();
    assert_eq!(f.character.refresh("head").await.unwrap(), 2);

    let hat = node_of(&f.character, "head/hat").await;
    let head = node_of(&f.character, "head").await;
    let scene = f.scene.lock().await;
    assert_eq!(scene.get(hat).unwrap().transform.position, Vec3::new(0.0, 1.5, 0.0));
    assert!(scene.find_child_by_name(head, "socket:hat").is_some());
}

#[tokio::test]
async fn test_create_applies_defaults_then_overrides() {
    let f = fixture().await;
    let character = Character::create(
        Arc::clone(&f.catalog),
        Arc::clone(&f.scene),
        memory_loader(Arc::clone(&f.transport)),
        vec![
            ("head_b".to_string(), "head".to_string()),
            ("hat_a".to_string(), "head/hat".to_string()),
        ],
        PlayerColors::default(),
    )
    .await
    .unwrap();

    assert_eq!(character.phase().await, Phase::Ready);
    let active = character.active_models().await;
    for slot in ["body", "hand/left", "hand/right", "rope/left", "rope/right"] {
        assert!(active.contains_key(slot), "missing {slot}");
    }
    assert_eq!(active.get("head").map(String::as_str), Some("head_b"));
    assert_eq!(active.get("head/hat").map(String::as_str), Some("hat_a"));
    assert!(character.pending_attachments().await.is_empty());

    let hat = character.equipped("head/hat").await.unwrap();
    let head = node_of(&character, "head").await;
    let scene = f.scene.lock().await;
    assert_eq!(scene.parent(hat.node), Some(head));
    assert_eq!(scene.parent(head), Some(character.root()));
}

#[tokio::test]
async fn test_skeleton_is_shared_with_skinned_parts() {
    let f = fixture().await;
    let skinned = encode(&[plain_material(0)], &[triangle(0, 0, SKINNED)], None);
    let animated = encode(&[plain_material(0)], &[triangle(0, 0, SKINNED)], Some("body_idle.*"));
    f.transport.insert(mesh_url("hand"), skinned);
    f.transport.insert(mesh_url("body"), animated);
    f.transport.insert(
        format!("{}/body_idle.anim.json", BASE_URL),
        r#"{"bones":[{"name":"spine"},{"name":"arm","parent":0}],"clips":[]}"#,
    );

    f.character.equip("hand", "hand/left").await.unwrap();
    assert!(f.character.skeleton().await.is_none());
    f.character.equip("body", "body").await.unwrap();

    let skeleton = f.character.skeleton().await.expect("body supplies a skeleton");
    assert_eq!(skeleton.bones.len(), 2);
    let hand = node_of(&f.character, "hand/left").await;
    let body = node_of(&f.character, "body").await;
    let scene = f.scene.lock().await;
    for part in [hand, body] {
        let mesh = scene.get(first_mesh(&scene, part)).unwrap().mesh().unwrap();
        assert_eq!(mesh.skeleton, Some(skeleton.id));
    }
}

#[tokio::test]
async fn test_dispose_clears_everything() {
    let f = fixture().await;
    f.character.equip("head_a", "head").await.unwrap();
    f.character.equip("hat_a", "head/hat").await.unwrap();
    f.character.dispose().await;

    assert_eq!(f.character.phase().await, Phase::Disposed);
    assert!(f.character.active_models().await.is_empty());
    assert!(!f.scene.lock().await.contains(f.character.root()));
    assert_eq!(
        f.character.equip("head_a", "head").await,
        Err(PlayerError::Disposed)
    );
}
