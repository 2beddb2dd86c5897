//! Writes a transform record onto a node's local transform

use super::graph::LocalTransform;
use crate::catalog::{Scale, TransformRecord};
use glam::Vec3;

pub fn euler_degrees_to_radians(degrees: [f32; 3]) -> Vec3 {
    Vec3::new(
        degrees[0].to_radians(),
        degrees[1].to_radians(),
        degrees[2].to_radians(),
    )
}

/// Reset to identity, then apply whatever fields the record defines.
///
/// Rotation is authored in degrees as `[x, y, z]` and applied yaw (Y), pitch (X),
/// roll (Z). A scalar scale multiplies the (identity) scale; a vector scale sets
/// each axis directly.
pub fn apply_transform(target: &mut LocalTransform, record: &TransformRecord) {
    *target = LocalTransform::IDENTITY;

    if let Some(position) = record.position {
        target.position = Vec3::from_array(position);
    }
    if let Some(rotation) = record.rotation {
        target.rotation = euler_degrees_to_radians(rotation);
    }
    match record.scale {
        Some(Scale::Uniform(factor)) => target.scale *= factor,
        Some(Scale::Axes(axes)) => target.scale = Vec3::from_array(axes),
        None => {}
    }
}
