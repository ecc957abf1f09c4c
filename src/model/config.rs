use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::connectivity::compat::CompatibilityRule;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub tolerances: ToleranceConfig,
    #[serde(default)]
    pub compatibility: CompatibilityConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Two fields are considered facing the same way when their up vectors'
    /// dot product is at least this.
    pub parallel_dot_threshold: f32,
    /// Largest tilt (degrees) a brick may be rotated through to snap.
    pub max_alignment_angle_deg: f32,
    /// Half-height of the overlap query box above and below a field.
    pub query_vertical_margin: f32,
    /// Max distance between two slot centers for them to count as coincident.
    pub slot_match_tolerance: f32,
    /// Colliders are shrunk by this much so touching faces don't collide.
    pub collision_epsilon: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityConfig {
    /// Applied over the default compatibility table, in order.
    #[serde(default)]
    pub rules: Vec<CompatibilityRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerances: ToleranceConfig {
                parallel_dot_threshold: 0.95,
                max_alignment_angle_deg: 91.0,
                query_vertical_margin: 0.1,
                slot_match_tolerance: 0.2,
                collision_epsilon: 0.02,
            },
            compatibility: CompatibilityConfig::default(),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "brickfit")
        .map(|dirs| dirs.config_dir().join("settings.toml"))
}

impl EngineConfig {
    /// Settings from the user config directory. A missing file is created
    /// with defaults; a malformed one is reported and ignored.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path);
            return config;
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Failed to parse config {}: {e}. Using defaults.", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read config {}: {e}. Using defaults.", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        let Some(path) = config_path() else {
            log::warn!("Could not determine config directory");
            return;
        };
        self.save_to(&path);
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {e}");
                return;
            }
        }

        match toml::to_string_pretty(self) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(path, contents) {
                    log::warn!("Failed to write config: {e}");
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize config: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::compat::Classification;
    use crate::connectivity::connection::ConnectionType;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tolerances.parallel_dot_threshold, 0.95);
        assert_eq!(config.tolerances.max_alignment_angle_deg, 91.0);
        assert!(config.compatibility.rules.is_empty());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let mut config = EngineConfig::default();
        config.compatibility.rules.push(CompatibilityRule::new(
            ConnectionType::Pin,
            ConnectionType::AxleHole,
            Classification::Connect,
        ));
        let serialized = toml::to_string_pretty(&config).expect("serialize");
        let deserialized: EngineConfig = toml::from_str(&serialized).expect("deserialize");
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_compatibility_section_optional() {
        let text = r#"
            [tolerances]
            parallel_dot_threshold = 0.9
            max_alignment_angle_deg = 45.0
            query_vertical_margin = 0.05
            slot_match_tolerance = 0.1
            collision_epsilon = 0.01
        "#;
        let config: EngineConfig = toml::from_str(text).expect("parse");
        assert_eq!(config.tolerances.max_alignment_angle_deg, 45.0);
        assert!(config.compatibility.rules.is_empty());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.toml");
        let mut config = EngineConfig::default();
        config.tolerances.collision_epsilon = 0.05;
        config.save_to(&path);
        assert_eq!(EngineConfig::load_from(&path), config);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "tolerances = 3").expect("write");
        assert_eq!(EngineConfig::load_from(&path), EngineConfig::default());
    }
}
