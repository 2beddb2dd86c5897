//! Item definition records as they appear in the catalog JSON

use crate::materials::MaterialRole;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Scale is authored either as one scalar or as a per-axis vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scale {
    Uniform(f32),
    Axes([f32; 3]),
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Uniform(1.0)
    }
}

/// Partial transform; every field is optional so layers can be merged per field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    /// Degrees, `[x, y, z]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
}

impl TransformRecord {
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: [f32; 3]) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.rotation.is_none() && self.scale.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSlot {
    #[serde(default)]
    pub role: MaterialRole,
    #[serde(
        default,
        rename = "literalColor",
        alias = "color",
        skip_serializing_if = "Option::is_none"
    )]
    pub literal_color: Option<[f32; 4]>,
}

impl MaterialSlot {
    pub fn role(role: MaterialRole) -> Self {
        Self {
            role,
            literal_color: None,
        }
    }

    pub fn literal(rgba: [f32; 4]) -> Self {
        Self {
            role: MaterialRole::Literal,
            literal_color: Some(rgba),
        }
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Slash-delimited slot path; the first segment names the base slot
    #[serde(rename = "type")]
    pub item_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialSlot>,

    /// Anchors for children, keyed by slot name relative to this item's base
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attachment_points: BTreeMap<String, TransformRecord>,

    /// Placement on a specific parent item, keyed by that parent's identifier
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attachment_point_overrides: BTreeMap<String, TransformRecord>,

    /// Anchor name to use on the parent when it differs from the slot name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_point: Option<String>,

    #[serde(
        default,
        rename = "initialTransform",
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_transform: Option<TransformRecord>,

    /// Fields this crate does not interpret; kept so merges round-trip them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemDefinition {
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            file: None,
            materials: Vec::new(),
            attachment_points: BTreeMap::new(),
            attachment_point_overrides: BTreeMap::new(),
            attachment_point: None,
            initial_transform: None,
            extra: Map::new(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_material(mut self, slot: MaterialSlot) -> Self {
        self.materials.push(slot);
        self
    }

    pub fn with_anchor(mut self, name: impl Into<String>, transform: TransformRecord) -> Self {
        self.attachment_points.insert(name.into(), transform);
        self
    }

    pub fn with_override(mut self, parent_id: impl Into<String>, transform: TransformRecord) -> Self {
        self.attachment_point_overrides.insert(parent_id.into(), transform);
        self
    }

    pub fn with_attachment_point(mut self, anchor: impl Into<String>) -> Self {
        self.attachment_point = Some(anchor.into());
        self
    }

    pub fn with_initial_transform(mut self, transform: TransformRecord) -> Self {
        self.initial_transform = Some(transform);
        self
    }

    /// First segment of the type
    pub fn base_type(&self) -> &str {
        self.item_type.split('/').next().unwrap_or_default()
    }

    pub fn is_nested(&self) -> bool {
        self.item_type.contains('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_interchange_shape() {
        let doc = json!({
            "type": "head/hat",
            "file": "tophat",
            "materials": [
                { "role": "primary" },
                { "role": "literal", "literalColor": [1.0, 0.0, 0.0, 1.0] }
            ],
            "attachment_point_overrides": {
                "head_big": { "position": [0.0, 0.2, 0.0], "scale": [1.0, 1.2, 1.0] }
            },
            "initialTransform": { "scale": 0.5 },
            "author": "someone"
        });
        let item: ItemDefinition = serde_json::from_value(doc).unwrap();
        assert_eq!(item.base_type(), "head");
        assert!(item.is_nested());
        assert_eq!(item.materials[1].literal_color, Some([1.0, 0.0, 0.0, 1.0]));
        let ov = &item.attachment_point_overrides["head_big"];
        assert_eq!(ov.scale, Some(Scale::Axes([1.0, 1.2, 1.0])));
        assert_eq!(
            item.initial_transform.as_ref().and_then(|t| t.scale),
            Some(Scale::Uniform(0.5))
        );
        assert_eq!(item.extra.get("author"), Some(&json!("someone")));
    }

    #[test]
    fn test_serializes_without_empty_fields() {
        let item = ItemDefinition::new("body").with_file("body");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value, json!({ "type": "body", "file": "body" }));
    }
}
