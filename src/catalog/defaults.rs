//! Stock catalog entries and the hardcoded last-resort attachment transforms

use super::item::{ItemDefinition, MaterialSlot, Scale, TransformRecord};
use crate::materials::MaterialRole;

/// Identifiers of the stock base parts, equal to their types
pub const STOCK_BASE_ITEMS: [&str; 4] = ["head", "body", "hand", "rope"];

/// Entries seeded into an empty catalog at startup
pub fn stock_items() -> Vec<(String, ItemDefinition)> {
    vec![
        (
            "head".to_string(),
            ItemDefinition::new("head")
                .with_file("head")
                .with_material(MaterialSlot::role(MaterialRole::Primary))
                .with_material(MaterialSlot::role(MaterialRole::Visor))
                .with_initial_transform(TransformRecord::at([0.0, 1.6, 0.0])),
        ),
        (
            "body".to_string(),
            ItemDefinition::new("body")
                .with_file("body")
                .with_material(MaterialSlot::role(MaterialRole::Primary))
                .with_material(MaterialSlot::role(MaterialRole::Secondary))
                .with_material(MaterialSlot::role(MaterialRole::PrimaryDark)),
        ),
        (
            "hand".to_string(),
            ItemDefinition::new("hand")
                .with_file("hand")
                .with_material(MaterialSlot::role(MaterialRole::Secondary)),
        ),
        (
            "rope".to_string(),
            ItemDefinition::new("rope")
                .with_file("rope")
                .with_material(MaterialSlot::role(MaterialRole::SecondaryDark)),
        ),
        (
            "checkpoint".to_string(),
            ItemDefinition::new("checkpoint")
                .with_file("checkpoint")
                .with_material(MaterialSlot::role(MaterialRole::Primary))
                .with_material(MaterialSlot::literal([1.0, 0.85, 0.2, 1.0])),
        ),
    ]
}

/// Read-only transforms for well-known slot paths
pub fn default_transform(slot_path: &str) -> Option<TransformRecord> {
    let record = match slot_path {
        "head/hat" => TransformRecord::at([0.0, 0.35, 0.0]),
        "head/glasses" => TransformRecord::at([0.0, 0.1, 0.22]),
        "body/badge/left" => TransformRecord::at([-0.15, 0.25, 0.2]).with_rotation([0.0, 0.0, 10.0]),
        "body/badge/right" => TransformRecord::at([0.15, 0.25, 0.2]).with_rotation([0.0, 0.0, -10.0]),
        "body/backpack" => TransformRecord::at([0.0, 0.2, -0.25]).with_rotation([0.0, 180.0, 0.0]),
        "hand/left" => TransformRecord::at([-0.45, 0.9, 0.0]),
        "hand/right" => TransformRecord::at([0.45, 0.9, 0.0]).with_scale(Scale::Axes([-1.0, 1.0, 1.0])),
        "rope/left/end" => TransformRecord::at([0.0, -1.0, 0.0]),
        "rope/right/end" => TransformRecord::at([0.0, -1.0, 0.0]),
        _ => return None,
    };
    Some(record)
}
