use super::defaults::stock_items;
use super::item::{ItemDefinition, TransformRecord};
use super::{CatalogError, CatalogResult};
use crate::attachment::slot::BaseSlots;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub type CatalogHandle = Arc<RwLock<ItemStore>>;

/// Where an item came from. Anchor edits on a stock parent go to the global
/// fallback table; edits on a custom parent go to its own anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrigin {
    Stock,
    Custom,
}

/// Field-level result of a catalog edit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub id: String,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    /// Anchor names added, edited or removed on this item
    pub anchors_touched: BTreeSet<String>,
    /// Parent identifiers whose override on this item was added, edited or removed
    pub overrides_touched: BTreeSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    pub fn touches(&self, field: &str) -> bool {
        self.changed.iter().chain(self.removed.iter()).any(|f| f == field)
    }
}

/// Item catalog plus the global fallback anchor table
#[derive(Debug, Default)]
pub struct ItemStore {
    items: HashMap<String, ItemDefinition>,
    origins: HashMap<String, ItemOrigin>,
    fallbacks: BTreeMap<String, TransformRecord>,
    base_slots: BaseSlots,
    revision: u64,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the stock base parts
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.seed_defaults();
        store
    }

    pub fn into_handle(self) -> CatalogHandle {
        Arc::new(RwLock::new(self))
    }

    /// Bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ItemDefinition> {
        self.items.get(id)
    }

    pub fn require(&self, id: &str) -> CatalogResult<&ItemDefinition> {
        self.items
            .get(id)
            .ok_or_else(|| CatalogError::UnknownItem { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemDefinition)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn origin(&self, id: &str) -> Option<ItemOrigin> {
        self.origins.get(id).copied()
    }

    pub fn is_stock(&self, id: &str) -> bool {
        self.origin(id) == Some(ItemOrigin::Stock)
    }

    pub fn base_slots(&self) -> &BaseSlots {
        &self.base_slots
    }

    /// Add a custom base type that attaches under the character root
    pub fn register_base_type(&mut self, name: &str) -> CatalogResult<bool> {
        if name.is_empty() || name.contains('/') {
            return Err(CatalogError::InvalidRecord {
                id: name.to_string(),
                reason: "base type must be a single slot segment".to_string(),
            });
        }
        let added = self.base_slots.register(name);
        if added {
            info!("📋 Registered custom base type '{}'", name);
            self.revision += 1;
        }
        Ok(added)
    }

    /// Insert or overwrite an entry. An existing origin is kept; new entries are custom.
    pub fn register(&mut self, id: impl Into<String>, item: ItemDefinition) -> CatalogResult<()> {
        let id = id.into();
        self.validate(&id, &item)?;
        self.origins.entry(id.clone()).or_insert(ItemOrigin::Custom);
        self.items.insert(id, item);
        self.revision += 1;
        Ok(())
    }

    pub fn register_stock(&mut self, id: impl Into<String>, item: ItemDefinition) -> CatalogResult<()> {
        let id = id.into();
        self.validate(&id, &item)?;
        self.origins.insert(id.clone(), ItemOrigin::Stock);
        self.items.insert(id, item);
        self.revision += 1;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<ItemDefinition> {
        let removed = self.items.remove(id);
        if removed.is_some() {
            self.origins.remove(id);
            self.revision += 1;
        }
        removed
    }

    /// Install stock entries that are not present yet. Returns how many were added.
    pub fn seed_defaults(&mut self) -> usize {
        let mut added = 0;
        for (id, item) in stock_items() {
            if self.items.contains_key(&id) {
                debug!("Keeping existing catalog entry '{}'", id);
                continue;
            }
            self.origins.insert(id.clone(), ItemOrigin::Stock);
            self.items.insert(id, item);
            added += 1;
        }
        if added > 0 {
            self.revision += 1;
        }
        added
    }

    fn validate(&self, id: &str, item: &ItemDefinition) -> CatalogResult<()> {
        if id.is_empty() {
            return Err(CatalogError::InvalidRecord {
                id: id.to_string(),
                reason: "empty identifier".to_string(),
            });
        }
        let base = item.base_type();
        if !self.base_slots.is_base_type(base) {
            return Err(CatalogError::InvalidRecord {
                id: id.to_string(),
                reason: format!("unknown base slot '{}' in type '{}'", base, item.item_type),
            });
        }
        Ok(())
    }

    fn parse_record(&self, id: &str, value: Value) -> CatalogResult<ItemDefinition> {
        if !value.is_object() {
            return Err(CatalogError::NotAnObject { id: id.to_string() });
        }
        let item: ItemDefinition =
            serde_json::from_value(value).map_err(|e| CatalogError::InvalidRecord {
                id: id.to_string(),
                reason: e.to_string(),
            })?;
        self.validate(id, &item)?;
        Ok(item)
    }

    fn record_value(id: &str, item: &ItemDefinition) -> CatalogResult<Map<String, Value>> {
        match serde_json::to_value(item) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(CatalogError::NotAnObject { id: id.to_string() }),
            Err(e) => Err(CatalogError::InvalidRecord {
                id: id.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Update only the fields present in `patch`; other fields are left alone
    pub fn update_fields(&mut self, id: &str, patch: &Value) -> CatalogResult<ChangeSet> {
        let Value::Object(patch) = patch else {
            return Err(CatalogError::NotAnObject { id: id.to_string() });
        };
        let old = Self::record_value(id, self.require(id)?)?;
        let mut next = old.clone();
        for (key, value) in patch {
            next.insert(key.clone(), value.clone());
        }
        self.commit(id, old, next)
    }

    /// Merge an edited JSON document into an existing entry: changed fields are
    /// updated and fields missing from the document are deleted. A document that
    /// fails to parse or validate leaves the store untouched.
    pub fn merge_document(&mut self, id: &str, text: &str) -> CatalogResult<ChangeSet> {
        let parsed: Value = serde_json::from_str(text).map_err(|e| CatalogError::MalformedDocument {
            reason: e.to_string(),
        })?;
        let Value::Object(incoming) = parsed else {
            return Err(CatalogError::NotAnObject { id: id.to_string() });
        };

        let old = match self.items.get(id) {
            Some(item) => Self::record_value(id, item)?,
            None => Map::new(),
        };
        let mut next = old.clone();
        for (key, value) in &incoming {
            if old.get(key) != Some(value) {
                next.insert(key.clone(), value.clone());
            }
        }
        let stale: Vec<String> = old.keys().filter(|k| !incoming.contains_key(*k)).cloned().collect();
        for key in stale {
            next.remove(&key);
        }
        self.commit(id, old, next)
    }

    fn commit(&mut self, id: &str, old: Map<String, Value>, next: Map<String, Value>) -> CatalogResult<ChangeSet> {
        let item = self.parse_record(id, Value::Object(next.clone()))?;

        let mut changes = ChangeSet {
            id: id.to_string(),
            ..Default::default()
        };
        for (key, value) in &next {
            if old.get(key) != Some(value) {
                changes.changed.push(key.clone());
            }
        }
        for key in old.keys() {
            if !next.contains_key(key) {
                changes.removed.push(key.clone());
            }
        }
        changes.anchors_touched = touched_keys(old.get("attachment_points"), next.get("attachment_points"));
        changes.overrides_touched = touched_keys(
            old.get("attachment_point_overrides"),
            next.get("attachment_point_overrides"),
        );

        if changes.is_empty() {
            debug!("No changes for catalog entry '{}'", id);
            return Ok(changes);
        }
        info!(
            "📋 Catalog entry '{}' updated ({} changed, {} removed)",
            id,
            changes.changed.len(),
            changes.removed.len()
        );
        self.origins.entry(id.to_string()).or_insert(ItemOrigin::Custom);
        self.items.insert(id.to_string(), item);
        self.revision += 1;
        Ok(changes)
    }

    /// Write one anchor on a parent item
    pub fn set_anchor(&mut self, parent_id: &str, anchor: &str, transform: TransformRecord) -> CatalogResult<()> {
        let item = self
            .items
            .get_mut(parent_id)
            .ok_or_else(|| CatalogError::UnknownItem { id: parent_id.to_string() })?;
        item.attachment_points.insert(anchor.to_string(), transform);
        self.revision += 1;
        Ok(())
    }

    /// Write one parent-specific override on a child item
    pub fn set_override(&mut self, child_id: &str, parent_id: &str, transform: TransformRecord) -> CatalogResult<()> {
        let item = self
            .items
            .get_mut(child_id)
            .ok_or_else(|| CatalogError::UnknownItem { id: child_id.to_string() })?;
        item.attachment_point_overrides.insert(parent_id.to_string(), transform);
        self.revision += 1;
        Ok(())
    }

    pub fn fallbacks(&self) -> &BTreeMap<String, TransformRecord> {
        &self.fallbacks
    }

    pub fn fallback(&self, slot_path: &str) -> Option<&TransformRecord> {
        self.fallbacks.get(slot_path)
    }

    pub fn set_fallback(&mut self, slot_path: impl Into<String>, transform: TransformRecord) {
        self.fallbacks.insert(slot_path.into(), transform);
        self.revision += 1;
    }

    pub fn remove_fallback(&mut self, slot_path: &str) -> Option<TransformRecord> {
        let removed = self.fallbacks.remove(slot_path);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    pub fn save_fallbacks(&self, path: &Path) -> CatalogResult<()> {
        let text = serde_json::to_string_pretty(&self.fallbacks).map_err(|e| CatalogError::Io {
            reason: e.to_string(),
        })?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, text)?;
        info!("🗄️ Saved {} fallback anchors to {}", self.fallbacks.len(), path.display());
        Ok(())
    }

    /// Replace the fallback table with the contents of `path`
    pub fn load_fallbacks(&mut self, path: &Path) -> CatalogResult<usize> {
        let text = std::fs::read_to_string(path)?;
        let table: BTreeMap<String, TransformRecord> =
            serde_json::from_str(&text).map_err(|e| CatalogError::MalformedDocument {
                reason: e.to_string(),
            })?;
        let count = table.len();
        self.fallbacks = table;
        self.revision += 1;
        info!("🗄️ Loaded {} fallback anchors from {}", count, path.display());
        Ok(count)
    }

    /// Import a catalog document keyed by identifier. Nothing is registered
    /// unless every entry parses and validates.
    pub fn load_catalog_json(&mut self, text: &str) -> CatalogResult<usize> {
        let parsed: Value = serde_json::from_str(text).map_err(|e| CatalogError::MalformedDocument {
            reason: e.to_string(),
        })?;
        let Value::Object(entries) = parsed else {
            return Err(CatalogError::MalformedDocument {
                reason: "catalog root must be an object keyed by item identifier".to_string(),
            });
        };

        let mut staged = Vec::with_capacity(entries.len());
        for (id, value) in entries {
            let item = self.parse_record(&id, value)?;
            staged.push((id, item));
        }

        let count = staged.len();
        for (id, item) in staged {
            if self.items.contains_key(&id) {
                warn!("Catalog import overwrites '{}'", id);
            }
            self.origins.entry(id.clone()).or_insert(ItemOrigin::Custom);
            self.items.insert(id, item);
        }
        self.revision += 1;
        info!("📋 Imported {} catalog entries", count);
        Ok(count)
    }

    pub fn export_catalog_json(&self) -> CatalogResult<String> {
        let sorted: BTreeMap<&String, &ItemDefinition> = self.items.iter().collect();
        serde_json::to_string_pretty(&sorted).map_err(|e| CatalogError::Io {
            reason: e.to_string(),
        })
    }
}

fn touched_keys(old: Option<&Value>, new: Option<&Value>) -> BTreeSet<String> {
    let empty = Map::new();
    let old = old.and_then(Value::as_object).unwrap_or(&empty);
    let new = new.and_then(Value::as_object).unwrap_or(&empty);
    old.keys()
        .chain(new.keys())
        .filter(|k| old.get(*k) != new.get(*k))
        .cloned()
        .collect()
}
