//! Asset loader: reference → fetched bytes → decoded container → scene nodes

use super::animation::{parse_animation, AnimationClip, Skeleton};
use super::cache::{CacheStats, PayloadCache};
use super::mesh::{MeshAsset, MeshRecord};
use super::transport::{AssetTransport, BlobRegistry};
use super::{AssetError, AssetResult};
use crate::config::{AssetSettings, DecodePool, DecodePoolConfig, EditorSettings};
use crate::scene::{MaterialBinding, MeshPrimitive, NodeId, NodeKind, SceneGraph};
use bytes::Bytes;
use glam::Vec3;
use std::sync::Arc;
use tracing::{debug, info, warn};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Result of a load. An empty result is valid and inert.
#[derive(Debug, Clone, Default)]
pub struct LoadedAsset {
    pub reference: String,
    pub url: String,
    pub mesh: Option<Arc<MeshAsset>>,
    pub skeleton: Option<Arc<Skeleton>>,
    pub clips: Vec<AnimationClip>,
    /// The container named a companion animation that could not be loaded
    pub animation_failed: bool,
}

impl LoadedAsset {
    fn empty(reference: &str, url: String) -> Self {
        Self {
            reference: reference.to_string(),
            url,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.as_ref().map(|m| m.meshes.is_empty()).unwrap_or(true)
    }

    /// Build a group node holding one primitive per decoded mesh.
    /// The group is left unattached.
    pub fn instantiate(&self, scene: &mut SceneGraph, name: &str) -> NodeId {
        let group = scene.create_group(name);
        let Some(asset) = &self.mesh else {
            return group;
        };
        for record in &asset.meshes {
            let base_color = asset
                .material(record.material_id)
                .and_then(|m| m.colors.first())
                .map(|c| c.rgba)
                .unwrap_or(WHITE);
            let primitive = MeshPrimitive {
                mesh_id: record.id,
                material_id: record.material_id,
                material_position: asset.material_position(record.material_id),
                vertex_count: record.vertex_count,
                index_count: record.indices.len(),
                skinned: record.is_skinned(),
                skeleton: None,
                bounds: bounds_of(record),
                material: MaterialBinding {
                    role: None,
                    index: None,
                    base_color,
                    color: base_color,
                },
            };
            let node = scene.create_node(format!("{}#{}", name, record.id), NodeKind::Mesh(primitive));
            scene.attach(group, node);
        }
        group
    }
}

fn bounds_of(record: &MeshRecord) -> Option<(Vec3, Vec3)> {
    let mut positions = (0..record.vertex_count as usize).filter_map(|i| record.position(i));
    let first = Vec3::from_array(positions.next()?);
    Some(positions.fold((first, first), |(lo, hi), p| {
        let p = Vec3::from_array(p);
        (lo.min(p), hi.max(p))
    }))
}

/// Replace every skinned primitive under `root` with a static copy.
/// Name, local transform, metadata, children and sibling position are kept.
pub fn demote_skinned(scene: &mut SceneGraph, root: NodeId) -> usize {
    let skinned: Vec<NodeId> = scene
        .traverse(root)
        .into_iter()
        .filter(|&id| scene.get(id).and_then(|n| n.mesh()).map(|m| m.skinned).unwrap_or(false))
        .collect();

    for &old in &skinned {
        let Some(node) = scene.get(old).cloned() else {
            continue;
        };
        let NodeKind::Mesh(mut primitive) = node.kind else {
            continue;
        };
        primitive.skinned = false;
        primitive.skeleton = None;
        let replacement = scene.create_node(node.name, NodeKind::Mesh(primitive));
        if let Some(new_node) = scene.get_mut(replacement) {
            new_node.transform = node.transform;
            new_node.meta = node.meta;
        }
        if old == root {
            warn!("Skinned part root cannot be demoted in place");
            scene.remove_subtree(replacement);
            continue;
        }
        scene.replace_node(old, replacement);
    }
    if !skinned.is_empty() {
        debug!("Demoted {} skinned primitives to static", skinned.len());
    }
    skinned.len()
}

/// Everything after the last `/` replaced by `name`
fn sibling_url(url: &str, name: &str) -> String {
    match url.rfind('/') {
        Some(slash) => format!("{}{}", &url[..=slash], name),
        None => name.to_string(),
    }
}

fn is_resolved(reference: &str) -> bool {
    BlobRegistry::is_blob(reference) || reference.contains("://") || reference.starts_with("data:")
}

pub struct AssetLoader {
    transport: Arc<dyn AssetTransport>,
    blobs: Arc<BlobRegistry>,
    pool: Arc<DecodePool>,
    cache: PayloadCache,
    settings: AssetSettings,
}

impl AssetLoader {
    pub fn new(transport: Arc<dyn AssetTransport>, pool: Arc<DecodePool>, settings: AssetSettings) -> Self {
        info!(
            "🗄️ Asset loader using {} transport, base '{}'",
            transport.name(),
            settings.base_url
        );
        Self {
            transport,
            blobs: Arc::new(BlobRegistry::new()),
            pool,
            cache: PayloadCache::new(settings.cache_size_mb),
            settings,
        }
    }

    /// Loader with its own decode pool sized from `settings`
    pub fn from_settings(transport: Arc<dyn AssetTransport>, settings: &EditorSettings) -> anyhow::Result<Self> {
        let pool = DecodePool::new(DecodePoolConfig::from(&settings.decoding))?;
        Ok(Self::new(transport, Arc::new(pool), settings.assets.clone()))
    }

    pub fn settings(&self) -> &AssetSettings {
        &self.settings
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Register a locally supplied file and get a loadable reference for it
    pub fn mint_local(&self, file_name: &str, data: impl Into<Bytes>) -> String {
        self.blobs.mint(file_name, data)
    }

    /// Already-resolved references pass through; bare names get the base location and mesh extension
    pub fn resolve_url(&self, reference: &str) -> String {
        if is_resolved(reference) {
            return reference.to_string();
        }
        let base = &self.settings.base_url;
        let separator = if base.is_empty() || base.ends_with('/') { "" } else { "/" };
        format!("{}{}{}.{}", base, separator, reference, self.settings.mesh_extension)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn fetch(&self, url: &str) -> AssetResult<Bytes> {
        if BlobRegistry::is_blob(url) {
            return self.blobs.get(url).ok_or_else(|| AssetError::HttpStatus {
                url: url.to_string(),
                status: 404,
            });
        }
        if let Some(bytes) = self.cache.get(url).await {
            debug!("Payload cache hit for {}", url);
            return Ok(bytes);
        }
        let bytes = self.transport.fetch(url).await?;
        self.cache.put(url, bytes.clone()).await;
        Ok(bytes)
    }

    /// Fetch, decode and pull in the companion animation. Never fails: fetch or
    /// decode errors are logged and produce an empty asset.
    pub async fn load(&self, reference: &str) -> LoadedAsset {
        let url = self.resolve_url(reference);

        let bytes = match self.fetch(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to fetch '{}': {}", url, e);
                return LoadedAsset::empty(reference, url);
            }
        };
        let asset = match self.pool.decode(bytes).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!("Failed to decode '{}': {}", url, e);
                return LoadedAsset::empty(reference, url);
            }
        };

        let mut loaded = LoadedAsset::empty(reference, url);
        if let Some(name) = asset.animation_name(&self.settings.animation_extension) {
            let animation_url = sibling_url(&loaded.url, &name);
            let parsed = match self.fetch(&animation_url).await {
                Ok(bytes) => parse_animation(&bytes),
                Err(e) => Err(e),
            };
            match parsed {
                Ok((skeleton, clips)) => {
                    debug!(
                        "Loaded skeleton with {} bones and {} clips from {}",
                        skeleton.bones.len(),
                        clips.len(),
                        animation_url
                    );
                    loaded.skeleton = Some(Arc::new(skeleton));
                    loaded.clips = clips;
                }
                Err(e) => {
                    warn!("Animation '{}' unavailable, skinned parts go static: {}", animation_url, e);
                    loaded.animation_failed = true;
                }
            }
        }
        debug!(
            "Loaded '{}': {} meshes, {} materials",
            loaded.url,
            asset.meshes.len(),
            asset.materials.len()
        );
        loaded.mesh = Some(Arc::new(asset));
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::mesh::test_support::*;
    use crate::assets::{MemoryTransport, VertexLayout};

    const SKINNED: VertexLayout = VertexLayout {
        uv_count: 1,
        has_color: false,
        has_tangent: false,
        has_skin: true,
    };

    fn loader(transport: Arc<MemoryTransport>) -> AssetLoader {
        let pool = DecodePool::new(DecodePoolConfig { workers: 1, stack_size: None }).unwrap();
        let settings = AssetSettings {
            base_url: "mem://parts".to_string(),
            ..Default::default()
        };
        AssetLoader::new(transport, Arc::new(pool), settings)
    }

    #[test]
    fn test_resolve_url() {
        let l = loader(Arc::new(MemoryTransport::new()));
        assert_eq!(l.resolve_url("hat"), "mem://parts/hat.mesh");
        assert_eq!(l.resolve_url("https://cdn/x.mesh"), "https://cdn/x.mesh");
        let blob = l.mint_local("hat.mesh", vec![1u8]);
        assert_eq!(l.resolve_url(&blob), blob);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let l = loader(Arc::new(MemoryTransport::new()));
        let loaded = l.load("nothing").await;
        assert!(loaded.is_empty());
        let mut scene = SceneGraph::new();
        let group = loaded.instantiate(&mut scene, "nothing");
        assert!(scene.children(group).is_empty());
    }

    #[tokio::test]
    async fn test_bad_payload_is_empty() {
        let transport = Arc::new(MemoryTransport::new());
        transport.insert("mem://parts/junk.mesh", vec![9u8, 9, 9, 9, 1]);
        let loaded = loader(transport).load("junk").await;
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_second_load_hits_cache() {
        let transport = Arc::new(MemoryTransport::new());
        let bytes = encode(&[plain_material(0)], &[triangle(0, 0, VertexLayout::default())], None);
        transport.insert("mem://parts/tri.mesh", bytes);
        let l = loader(transport);
        assert!(!l.load("tri").await.is_empty());
        assert!(!l.load("tri").await.is_empty());
        assert_eq!(l.cache_stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_animation_failure_demotes() {
        let transport = Arc::new(MemoryTransport::new());
        let bytes = encode(
            &[plain_material(0)],
            &[triangle(0, 0, VertexLayout::default()), triangle(1, 0, SKINNED)],
            Some("walk.*"),
        );
        transport.insert("mem://parts/arm.mesh", bytes);
        let loaded = loader(transport).load("arm").await;
        assert!(loaded.animation_failed);

        let mut scene = SceneGraph::new();
        let group = loaded.instantiate(&mut scene, "arm");
        let before: Vec<String> = scene
            .children(group)
            .iter()
            .map(|&c| scene.get(c).unwrap().name.clone())
            .collect();
        assert_eq!(demote_skinned(&mut scene, group), 1);
        let after: Vec<String> = scene
            .children(group)
            .iter()
            .map(|&c| scene.get(c).unwrap().name.clone())
            .collect();
        assert_eq!(before, after);
        assert!(scene
            .traverse(group)
            .iter()
            .all(|&id| !scene.get(id).unwrap().mesh().map(|m| m.skinned).unwrap_or(false)));
    }

    #[tokio::test]
    async fn test_companion_animation_loads() {
        let transport = Arc::new(MemoryTransport::new());
        let bytes = encode(&[plain_material(0)], &[triangle(0, 0, SKINNED)], Some("idle.*"));
        transport.insert("mem://parts/body.mesh", bytes);
        transport.insert(
            "mem://parts/idle.anim.json",
            r#"{"bones":[{"name":"root"}],"clips":[{"name":"idle","duration":1.0}]}"#,
        );
        let loaded = loader(transport).load("body").await;
        assert!(!loaded.animation_failed);
        assert_eq!(loaded.skeleton.as_ref().unwrap().bones.len(), 1);
        assert_eq!(loaded.clips.len(), 1);
    }
}
