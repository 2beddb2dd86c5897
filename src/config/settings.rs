use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use directories::ProjectDirs;
use serde::{Serialize, Deserialize};

const SETTINGS_FILE: &str = "editor.toml";
const FALLBACK_ANCHORS_FILE: &str = "fallback_anchors.json";

// =============================================================================
// Editor Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Base location prepended to bare item file names
    pub base_url: String,
    pub mesh_extension: String,
    /// Substituted for the wildcard in texture names
    pub texture_extension: String,
    /// Substituted for the wildcard in companion animation names
    pub animation_extension: String,
    pub cache_size_mb: usize,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            base_url: "assets/".to_string(),
            mesh_extension: "mesh".to_string(),
            texture_extension: "png".to_string(),
            animation_extension: "anim.json".to_string(),
            cache_size_mb: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeSettings {
    /// Number of background decode workers
    pub workers: usize,
    pub stack_size_kb: Option<usize>,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().clamp(1, 4),
            stack_size_kb: Some(2 * 1024),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub primary_color: [f32; 4],
    pub secondary_color: [f32; 4],
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            primary_color: [1.0, 1.0, 1.0, 1.0],
            secondary_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub assets: AssetSettings,
    pub decoding: DecodeSettings,
    pub player: PlayerSettings,
}

pub type EditorSettingsHandle = Arc<RwLock<EditorSettings>>;

pub fn create_editor_settings_handle(settings: EditorSettings) -> EditorSettingsHandle {
    Arc::new(RwLock::new(settings))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "outfit-forge", "outfit-forge")
}

fn settings_path() -> Option<PathBuf> {
    project_dirs().map(|proj| proj.config_dir().join(SETTINGS_FILE))
}

/// Default location of the persisted global fallback anchor table
pub fn fallback_anchors_path() -> Option<PathBuf> {
    project_dirs().map(|proj| proj.data_dir().join(FALLBACK_ANCHORS_FILE))
}

pub fn save_editor_settings(settings: &EditorSettings) -> std::io::Result<()> {
    if let Some(path) = settings_path() {
        save_editor_settings_to(settings, &path)?;
    }
    Ok(())
}

pub fn load_editor_settings() -> Option<EditorSettings> {
    settings_path().and_then(|path| load_editor_settings_from(&path))
}

pub fn save_editor_settings_to(settings: &EditorSettings, path: &std::path::Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(path, toml)
}

pub fn load_editor_settings_from(path: &std::path::Path) -> Option<EditorSettings> {
    let data = fs::read_to_string(path).ok()?;
    match toml::from_str::<EditorSettings>(&data) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!("Ignoring invalid settings file {}: {}", path.display(), e);
            None
        }
    }
}
