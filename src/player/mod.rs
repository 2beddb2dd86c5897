//! Character controller
//!
//! Tracks which item occupies which slot, places parts in the scene graph and
//! re-parents dependent parts when a base part is swapped. All shared state is
//! locked catalog → character state → scene, and no lock is held across an
//! asset load.

pub mod parts;
pub mod state;

pub use parts::rebuild_sockets;
pub use state::{CharacterState, EquippedPart, Phase, Placement, PlayerColors};

use crate::assets::{AssetLoader, Skeleton};
use crate::attachment::expand_dual;
use crate::catalog::{CatalogError, CatalogHandle, STOCK_BASE_ITEMS};
use crate::materials::apply_player_colors;
use crate::scene::{NodeId, SceneHandle};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    #[error("Item '{id}' is not in the catalog")]
    MissingItem { id: String },

    #[error("Unknown slot '{slot}'")]
    UnknownSlot { slot: String },

    #[error("Character has been disposed")]
    Disposed,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type PlayerResult<T> = Result<T, PlayerError>;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One composed character. Cloning yields another handle to the same character.
#[derive(Clone)]
pub struct Character {
    catalog: CatalogHandle,
    scene: SceneHandle,
    loader: Arc<AssetLoader>,
    state: Arc<Mutex<CharacterState>>,
    root: NodeId,
}

impl Character {
    /// Empty character with its own root node
    pub async fn new(
        catalog: CatalogHandle,
        scene: SceneHandle,
        loader: Arc<AssetLoader>,
        colors: PlayerColors,
    ) -> Self {
        let root = {
            let mut graph = scene.lock().await;
            let root = graph.create_group("player");
            if let Some(node) = graph.get_mut(root) {
                node.meta.player_root = true;
            }
            root
        };
        let mut state = CharacterState::new(colors);
        state.phase = Phase::Ready;
        Self {
            catalog,
            scene,
            loader,
            state: Arc::new(Mutex::new(state)),
            root,
        }
    }

    /// Character wearing the stock base parts, then `overrides` as (item, slot) pairs.
    /// Overrides are equipped concurrently once every default is in place.
    pub async fn create(
        catalog: CatalogHandle,
        scene: SceneHandle,
        loader: Arc<AssetLoader>,
        overrides: Vec<(String, String)>,
        colors: PlayerColors,
    ) -> PlayerResult<Self> {
        let character = Self::new(catalog, scene, loader, colors).await;
        character.state.lock().await.phase = Phase::Initializing;

        let [head, body, hand, rope] = STOCK_BASE_ITEMS;
        tokio::try_join!(
            character.equip(head, head),
            character.equip(body, body),
            character.equip(hand, hand),
            character.equip(rope, rope)
        )?;
        debug!("Default parts in place, applying {} overrides", overrides.len());

        let mut tasks = JoinSet::new();
        for (item_id, slot_key) in overrides {
            let this = character.clone();
            tasks.spawn(async move { this.equip(&item_id, &slot_key).await });
        }
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Initial equip failed: {}", e);
                    first_error.get_or_insert(e);
                }
                Err(e) => warn!("Initial equip task aborted: {}", e),
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        character.state.lock().await.phase = Phase::Ready;
        info!("🧍 Character ready with {} parts", character.active_models().await.len());
        Ok(character)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn scene(&self) -> SceneHandle {
        Arc::clone(&self.scene)
    }

    pub fn catalog(&self) -> CatalogHandle {
        Arc::clone(&self.catalog)
    }

    pub fn loader(&self) -> Arc<AssetLoader> {
        Arc::clone(&self.loader)
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Slot key → equipped item identifier
    pub async fn active_models(&self) -> BTreeMap<String, String> {
        self.state
            .lock()
            .await
            .active_models
            .iter()
            .map(|(slot, part)| (slot.clone(), part.item_id.clone()))
            .collect()
    }

    pub async fn equipped(&self, slot_key: &str) -> Option<EquippedPart> {
        self.state.lock().await.active_models.get(slot_key).cloned()
    }

    pub async fn pending_attachments(&self) -> BTreeMap<String, Vec<String>> {
        self.state.lock().await.pending_attachments.clone()
    }

    pub async fn skeleton(&self) -> Option<Arc<Skeleton>> {
        self.state.lock().await.skeleton.clone()
    }

    pub async fn colors(&self) -> PlayerColors {
        self.state.lock().await.colors
    }

    /// Put `item_id` into `slot_key`. A dual family request (`hand`, `rope/hook`)
    /// equips both sides concurrently.
    pub fn equip<'a>(&'a self, item_id: &'a str, slot_key: &'a str) -> BoxFuture<'a, PlayerResult<()>> {
        Box::pin(async move {
            if let Some([left, right]) = expand_dual(slot_key) {
                tokio::try_join!(self.equip(item_id, &left), self.equip(item_id, &right))?;
                return Ok(());
            }
            self.equip_slot(item_id, slot_key).await
        })
    }

    async fn equip_slot(&self, item_id: &str, slot_key: &str) -> PlayerResult<()> {
        let (item, displaced, colors) = {
            let catalog = self.catalog.read().await;
            let item = catalog
                .get(item_id)
                .cloned()
                .ok_or_else(|| PlayerError::MissingItem { id: item_id.to_string() })?;
            let bases = catalog.base_slots();
            if bases.base_of(slot_key).is_none() {
                return Err(PlayerError::UnknownSlot {
                    slot: slot_key.to_string(),
                });
            }

            let mut state = self.state.lock().await;
            if state.phase == Phase::Disposed {
                return Err(PlayerError::Disposed);
            }
            let mut scene = self.scene.lock().await;
            let displaced = if bases.is_root_slot(slot_key) && state.active_models.contains_key(slot_key) {
                state.descendants_of(slot_key)
            } else {
                Vec::new()
            };
            parts::remove_slot(&mut state, &mut scene, slot_key);
            (item, displaced, state.colors)
        };
        if !displaced.is_empty() {
            debug!("Swapping '{}' displaces {:?}", slot_key, displaced);
        }

        let built = parts::create_item(&self.loader, &self.scene, item_id, &item, slot_key, colors).await;

        {
            let catalog = self.catalog.read().await;
            let mut state = self.state.lock().await;
            let mut scene = self.scene.lock().await;
            if state.phase == Phase::Disposed {
                scene.remove_subtree(built.node);
                return Err(PlayerError::Disposed);
            }
            // Another equip may have landed here while this one was loading
            parts::remove_slot(&mut state, &mut scene, slot_key);

            if let Some(skeleton) = built.skeleton.clone() {
                let fresh = state.skeleton.as_ref().map(|s| s.id != skeleton.id).unwrap_or(true);
                if fresh {
                    info!("🦴 '{}' supplies the shared skeleton ({} bones)", item_id, skeleton.bones.len());
                    for part in state.active_models.values().filter(|p| p.skinned) {
                        scene.bind_skeleton(part.node, skeleton.id);
                    }
                    state.skeleton = Some(skeleton);
                    state.clips = built.clips.clone();
                }
            }
            if built.skinned {
                if let Some(skeleton) = &state.skeleton {
                    scene.bind_skeleton(built.node, skeleton.id);
                }
            }

            parts::register_part(&mut state, item_id, slot_key, &built);
            let attached = parts::place(&catalog, &mut state, &mut scene, self.root, slot_key);
            let released = parts::flush_pending(&catalog, &mut state, &mut scene, self.root, slot_key);
            info!(
                "🎽 Equipped '{}' in '{}'{}{}",
                item_id,
                slot_key,
                if attached { "" } else { " (pending parent)" },
                if released > 0 {
                    format!(", attached {} waiting parts", released)
                } else {
                    String::new()
                }
            );
        }

        if !displaced.is_empty() {
            self.reequip(displaced).await;
        }
        Ok(())
    }

    async fn reequip(&self, displaced: Vec<(String, String)>) {
        let mut tasks = JoinSet::new();
        for (item_id, slot_key) in displaced {
            let this = self.clone();
            tasks.spawn(async move {
                let result = this.equip(&item_id, &slot_key).await;
                (item_id, slot_key, result)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((item_id, slot_key, Err(e))) => {
                    warn!("Could not re-equip '{}' in '{}': {}", item_id, slot_key, e)
                }
                Ok(_) => {}
                Err(e) => warn!("Re-equip task aborted: {}", e),
            }
        }
    }

    /// Clear `slot_key` and everything attached below it. Returns whether anything was removed.
    pub async fn unequip(&self, slot_key: &str) -> PlayerResult<bool> {
        let keys = match expand_dual(slot_key) {
            Some(sides) => sides.to_vec(),
            None => vec![slot_key.to_string()],
        };
        let mut state = self.state.lock().await;
        if state.phase == Phase::Disposed {
            return Err(PlayerError::Disposed);
        }
        let mut scene = self.scene.lock().await;
        let mut removed = false;
        for key in keys {
            if parts::remove_slot(&mut state, &mut scene, &key) {
                info!("Unequipped '{}'", key);
                removed = true;
            }
        }
        Ok(removed)
    }

    /// Re-apply the catalog definition to the part in `slot_key` and everything below it
    pub async fn refresh(&self, slot_key: &str) -> PlayerResult<usize> {
        let keys = match expand_dual(slot_key) {
            Some(sides) => sides.to_vec(),
            None => vec![slot_key.to_string()],
        };
        let catalog = self.catalog.read().await;
        let mut state = self.state.lock().await;
        let mut scene = self.scene.lock().await;
        let mut refreshed = 0;
        for key in keys {
            if !state.active_models.contains_key(&key) {
                return Err(PlayerError::UnknownSlot { slot: key });
            }
            refreshed += parts::refresh_slot(&catalog, &mut state, &mut scene, self.root, &key);
        }
        debug!("Refreshed {} parts from '{}'", refreshed, slot_key);
        Ok(refreshed)
    }

    /// Refresh every slot `item_id` occupies
    pub async fn refresh_item(&self, item_id: &str) -> usize {
        let catalog = self.catalog.read().await;
        let mut state = self.state.lock().await;
        let mut scene = self.scene.lock().await;
        let slots: Vec<String> = state
            .active_models
            .iter()
            .filter(|(_, part)| part.item_id == item_id)
            .map(|(slot, _)| slot.clone())
            .collect();
        slots
            .iter()
            .map(|slot| parts::refresh_slot(&catalog, &mut state, &mut scene, self.root, slot))
            .sum()
    }

    /// Recolor every equipped part
    pub async fn set_colors(&self, colors: PlayerColors) {
        let catalog = self.catalog.read().await;
        let mut state = self.state.lock().await;
        let mut scene = self.scene.lock().await;
        state.colors = colors;
        for part in state.active_models.values() {
            if let Some(item) = catalog.get(&part.item_id) {
                apply_player_colors(&mut scene, part.node, item, colors.primary, colors.secondary);
            }
        }
    }

    /// Clear every slot and remove the character from the scene
    pub async fn dispose(&self) {
        let mut state = self.state.lock().await;
        let mut scene = self.scene.lock().await;
        for part in state.active_models.values() {
            scene.remove_subtree(part.node);
        }
        scene.remove_subtree(self.root);
        state.active_models.clear();
        state.pending_attachments.clear();
        state.children_of.clear();
        state.skeleton = None;
        state.clips.clear();
        state.phase = Phase::Disposed;
        info!("Character disposed");
    }
}
