use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::camera::CameraType;
use crate::dynamics::DYNAMICS_MAX_SUBSTEPS;
use crate::error::ConfigError;

/// Engine settings, read from TOML.
///
/// Every field is optional in the file; missing fields keep their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub caption: String,
    pub assets_root: PathBuf,
    pub window_width: u32,
    pub window_height: u32,
    /// Seconds advanced per rendered frame.
    pub frame_interval: f32,
    pub max_substeps: u32,
    /// Relative mouse movement beyond this many pixels is ignored.
    pub mouse_drop_threshold: i32,
    pub player_camera: CameraType,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            caption: "Jyuzau".to_string(),
            assets_root: PathBuf::from("assets"),
            window_width: 1280,
            window_height: 720,
            frame_interval: 1.0 / 60.0,
            max_substeps: DYNAMICS_MAX_SUBSTEPS,
            mouse_drop_threshold: 50,
            player_camera: CameraType::FirstPerson,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(
            EngineConfig::from_toml_str("").unwrap(),
            EngineConfig::default()
        );
    }

    #[test]
    fn fields_override_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            caption = "Demo"
            assets_root = "/srv/assets"
            window_width = 640
            player_camera = "following"
            "#,
        )
        .unwrap();
        assert_eq!(config.caption, "Demo");
        assert_eq!(config.assets_root, PathBuf::from("/srv/assets"));
        assert_eq!(config.window_width, 640);
        assert_eq!(config.window_height, 720);
        assert_eq!(config.player_camera, CameraType::Following);
    }

    #[test]
    fn bad_values_are_reported() {
        let err = EngineConfig::from_toml_str("window_width = \"wide\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(matches!(
            EngineConfig::load(Path::new("/nonexistent/jyuzau.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
