pub mod settings;
pub mod concurrency;

// Re-export commonly used types
pub use settings::{
    AssetSettings, DecodeSettings, PlayerSettings, EditorSettings, EditorSettingsHandle,
    create_editor_settings_handle, save_editor_settings, load_editor_settings,
    save_editor_settings_to, load_editor_settings_from, fallback_anchors_path,
};
pub use concurrency::{DecodePool, DecodePoolConfig, DecodePoolStats};
