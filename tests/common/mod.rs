#![allow(dead_code)]

use outfit_forge::assets::{AssetLoader, MemoryTransport, VertexLayout};
use outfit_forge::config::{AssetSettings, DecodePool, DecodePoolConfig};
use std::sync::Arc;

pub use outfit_forge::assets::mesh::test_support::{encode, plain_material, triangle, MeshSpec};

pub const BASE_URL: &str = "mem://parts";

pub const SKINNED: VertexLayout = VertexLayout {
    uv_count: 1,
    has_color: false,
    has_tangent: false,
    has_skin: true,
};

/// One plain material, one static triangle
pub fn triangle_part() -> Vec<u8> {
    encode(
        &[plain_material(0)],
        &[triangle(0, 0, VertexLayout::default())],
        None,
    )
}

pub fn mesh_url(name: &str) -> String {
    format!("{}/{}.mesh", BASE_URL, name)
}

pub fn memory_loader(transport: Arc<MemoryTransport>) -> Arc<AssetLoader> {
    let pool = DecodePool::new(DecodePoolConfig {
        workers: 2,
        stack_size: None,
    })
    .expect("decode pool");
    let settings = AssetSettings {
        base_url: BASE_URL.to_string(),
        ..Default::default()
    };
    Arc::new(AssetLoader::new(transport, Arc::new(pool), settings))
}
