// outfit-forge: cosmetic character assembly and mesh container decoding

pub mod utils;
pub mod config;
pub mod assets;
pub mod scene;
pub mod catalog;
pub mod attachment;
pub mod materials;
pub mod player;
pub mod preview;

// Re-export commonly used types for convenience
pub use assets::{AssetLoader, MeshAsset};
pub use catalog::{CatalogHandle, ItemDefinition, ItemStore, TransformRecord};
pub use config::{load_editor_settings, EditorSettings};
pub use player::{Character, PlayerColors, PlayerError};
pub use scene::{SceneGraph, SceneHandle};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
