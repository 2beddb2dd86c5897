mod common;

use common::*;
use outfit_forge::assets::mesh::{ColorEntry, ImageRef};
use outfit_forge::assets::{decode, DecodeError, MaterialRecord, VertexLayout};

#[test]
fn test_minimal_triangle() {
    let asset = decode(&triangle_part()).unwrap();
    assert_eq!(asset.materials.len(), 1);
    assert_eq!(asset.meshes.len(), 1);

    let mesh = &asset.meshes[0];
    assert_eq!(mesh.stride(), 6);
    assert_eq!(mesh.vertices.len(), 18);
    assert_eq!(mesh.indices.len(), 3);
    assert_eq!(mesh.indices.to_u32(), vec![0, 1, 2]);
    assert_eq!(mesh.position(1), Some([6.0, 7.0, 8.0]));
    assert!(asset.animation.is_none());
}

#[test]
fn test_varied_layouts() {
    let layouts = [
        VertexLayout { uv_count: 0, has_color: false, has_tangent: false, has_skin: false },
        VertexLayout { uv_count: 2, has_color: false, has_tangent: false, has_skin: false },
        VertexLayout { uv_count: 1, has_color: true, has_tangent: true, has_skin: false },
        VertexLayout { uv_count: 3, has_color: true, has_tangent: true, has_skin: true },
    ];
    let meshes: Vec<MeshSpec> = layouts
        .iter()
        .enumerate()
        .map(|(i, layout)| MeshSpec {
            id: i as u8,
            material_id: (i % 2) as u8,
            vertex_count: 4 + i as u32,
            layout: *layout,
            index_width: if i % 2 == 0 { 2 } else { 4 },
            indices: vec![0, 1, 2, 2, 3, 0],
        })
        .collect();
    let bytes = encode(&[plain_material(0), plain_material(1)], &meshes, None);
    let asset = decode(&bytes).unwrap();

    assert_eq!(asset.meshes.len(), layouts.len());
    for (mesh, layout) in asset.meshes.iter().zip(layouts.iter()) {
        let expected = 3
            + 3
            + 2 * layout.uv_count as usize
            + 4 * layout.has_color as usize
            + 4 * layout.has_tangent as usize
            + 8 * layout.has_skin as usize;
        assert_eq!(mesh.stride(), expected);
        assert_eq!(mesh.vertices.len(), mesh.vertex_count as usize * expected);
        assert_eq!(mesh.indices.len(), 6);
    }
    assert_eq!(asset.meshes[1].indices.width(), 4);
    assert!(asset.has_skinned_meshes());
}

#[test]
fn test_bad_magic_names_both_values() {
    let mut bytes = triangle_part();
    bytes[..4].copy_from_slice(b"NOPE");
    let err = decode(&bytes).unwrap_err();
    match &err {
        DecodeError::BadMagic { expected, actual } => {
            assert_eq!(*expected, u32::from_le_bytes(*b"PMSH"));
            assert_eq!(*actual, u32::from_le_bytes(*b"NOPE"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("expected"));
}

#[test]
fn test_truncated_animation_name_is_range_error() {
    let mut bytes = encode(
        &[plain_material(0)],
        &[triangle(0, 0, VertexLayout::default())],
        Some("walk.*"),
    );
    bytes.truncate(bytes.len() - 3);
    assert!(matches!(decode(&bytes), Err(DecodeError::OutOfRange { .. })));
}

#[test]
fn test_material_table_and_wildcards() {
    let material = MaterialRecord {
        id: 3,
        uv_channels: vec![
            vec![ImageRef { file_name: "skin_diffuse.*".to_string(), type_hint: 0 }],
            vec![ImageRef { file_name: "skin_mask.*".to_string(), type_hint: 1 }],
        ],
        colors: vec![ColorEntry { slot: 0, rgba: [0.2, 0.4, 0.6, 1.0] }],
    };
    let bytes = encode(
        &[plain_material(0), material],
        &[triangle(0, 3, VertexLayout { uv_count: 2, ..Default::default() })],
        Some("idle.*"),
    );
    let asset = decode(&bytes).unwrap();

    assert_eq!(asset.material_position(3), Some(1));
    assert_eq!(asset.material_position(1), None);
    let record = asset.material(3).unwrap();
    assert_eq!(
        record.texture_names("png"),
        vec!["skin_diffuse.png".to_string(), "skin_mask.png".to_string()]
    );
    assert_eq!(record.color(0), Some([0.2, 0.4, 0.6, 1.0]));
    assert_eq!(asset.animation_name("anim.json").as_deref(), Some("idle.anim.json"));
}
