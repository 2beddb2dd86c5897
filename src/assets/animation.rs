//! Companion animation asset
//!
//! Skinned parts share one skeleton per character. The animation document is
//! JSON: a bone hierarchy plus the clips that drive it.

use super::{AssetError, AssetResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone, `None` for roots
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub position: [f32; 3],
    /// Quaternion (x, y, z, w)
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub bone: String,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnimationDocument {
    bones: Vec<Bone>,
    #[serde(default)]
    clips: Vec<AnimationClip>,
}

/// Shared skeletal binding data
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub id: Uuid,
    pub bones: Vec<Bone>,
}

impl Skeleton {
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(|b| b.parent.is_none())
    }
}

/// Parse an animation document into a skeleton and its clips
pub fn parse_animation(bytes: &[u8]) -> AssetResult<(Skeleton, Vec<AnimationClip>)> {
    let doc: AnimationDocument = serde_json::from_slice(bytes).map_err(|e| AssetError::Animation {
        reason: e.to_string(),
    })?;

    if doc.bones.is_empty() {
        return Err(AssetError::Animation {
            reason: "animation document has no bones".to_string(),
        });
    }
    for (index, bone) in doc.bones.iter().enumerate() {
        if let Some(parent) = bone.parent {
            if parent >= index {
                return Err(AssetError::Animation {
                    reason: format!("bone '{}' references parent {} out of order", bone.name, parent),
                });
            }
        }
    }

    Ok((
        Skeleton {
            id: Uuid::new_v4(),
            bones: doc.bones,
        },
        doc.clips,
    ))
}
