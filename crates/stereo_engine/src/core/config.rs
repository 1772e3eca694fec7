//! Configuration system
//!
//! Externally-owned editor settings: the reparent policy, drag step
//! sizes and camera defaults. Components read these at the moment of
//! each operation; nothing here is a global singleton. Files load and
//! save in TOML or RON.

use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// What happens to a node's coordinates when it is reparented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReparentPolicy {
    /// Recompute local values against the new parent so the node keeps
    /// its world position and rotation
    Adapt,
    /// Keep local values; the world position jumps with the new parent
    None,
}

impl Default for ReparentPolicy {
    fn default() -> Self {
        Self::Adapt
    }
}

/// Editor settings owned by the session and handed to the components
/// that need them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Reparent coordinate policy, read at the moment of each move
    pub reparent_policy: ReparentPolicy,
    /// Step size for position drag fields
    pub position_step: f32,
    /// Step size for rotation drag fields
    pub rotation_step: f32,
    /// Default eye-to-center distance of the stereo camera
    pub eye_to_center: f32,
    /// Default cursor cross size
    pub cursor_size: f32,
    /// Log level for the engine
    pub log_level: String,
}

impl EngineSettings {
    /// Create settings with defaults
    pub fn new() -> Self {
        Self {
            reparent_policy: ReparentPolicy::default(),
            position_step: 0.01,
            rotation_step: 0.01,
            eye_to_center: 0.5,
            cursor_size: 0.1,
            log_level: "info".to_string(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.position_step <= 0.0 || self.rotation_step <= 0.0 {
            return Err("Step sizes must be positive".to_string());
        }
        if self.cursor_size <= 0.0 {
            return Err("Cursor size must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineSettings {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = EngineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.reparent_policy, ReparentPolicy::Adapt);
    }

    #[test]
    fn rejects_non_positive_steps() {
        let settings = EngineSettings {
            position_step: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let settings = EngineSettings {
            reparent_policy: ReparentPolicy::None,
            eye_to_center: 0.75,
            ..Default::default()
        };

        let text = toml::to_string(&settings).unwrap();
        let back: EngineSettings = toml::from_str(&text).unwrap();
        assert_eq!(back.reparent_policy, ReparentPolicy::None);
        assert!((back.eye_to_center - 0.75).abs() < f32::EPSILON);
    }
}
