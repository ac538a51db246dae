use crate::annotation::ToolDefaults;
use crate::export::DEFAULT_OUTPUT_PREFIX;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Editor defaults applied when a session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub default_scale: f32,
    pub default_font_size: f32,
    /// Sizes offered by the font size picker
    pub font_sizes: Vec<f32>,
    pub output_prefix: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            default_scale: 1.5,
            default_font_size: 12.0,
            font_sizes: vec![8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 24.0, 32.0],
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_owned(),
        }
    }
}

impl EditorSettings {
    pub fn tool_defaults(&self) -> ToolDefaults {
        ToolDefaults { font_size: self.default_font_size }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = |value: f32| value.is_finite() && value > 0.0;

        if !positive(self.default_scale) {
            return Err(SettingsError::Invalid(format!("default_scale {}", self.default_scale)));
        }
        if self.font_sizes.is_empty() || !self.font_sizes.iter().all(|size| positive(*size)) {
            return Err(SettingsError::Invalid("font_sizes must be positive".to_owned()));
        }
        if !self.font_sizes.contains(&self.default_font_size) {
            return Err(SettingsError::Invalid(format!(
                "default_font_size {} is not one of font_sizes",
                self.default_font_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsEnvelope {
    version: u32,
    settings: EditorSettings,
}

impl SettingsStore {
    pub fn from_default_project() -> Result<Self, SettingsError> {
        let dirs = ProjectDirs::from("dev", "PdfAnnotator", "PdfAnnotator")
            .ok_or(SettingsError::NoDataDirectory)?;

        Ok(Self { root: dirs.config_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self) -> Result<EditorSettings, SettingsError> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(EditorSettings::default());
        }

        load_file(&path)
    }

    pub fn save(&self, settings: &EditorSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        fs::create_dir_all(&self.root)?;

        let envelope =
            SettingsEnvelope { version: SETTINGS_SCHEMA_VERSION, settings: settings.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.settings_path(), bytes)?;
        Ok(())
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }
}

/// Reads a settings file written by [`SettingsStore::save`].
pub fn load_file(path: &Path) -> Result<EditorSettings, SettingsError> {
    let bytes = fs::read(path)?;
    let envelope: SettingsEnvelope = serde_json::from_slice(&bytes)?;
    if envelope.version > SETTINGS_SCHEMA_VERSION {
        log::warn!(
            "settings schema version {} is newer than supported {}",
            envelope.version,
            SETTINGS_SCHEMA_VERSION
        );
    }

    envelope.settings.validate()?;
    Ok(envelope.settings)
}
