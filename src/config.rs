//! Configuration for figure layout

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::angle::ANGLE_EPSILON;

/// Errors that can occur when loading an engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// How a socket arranges its title and parameter figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Content radiates outward along the socket angle
    #[default]
    Radial,
    /// Parameters stack upward on top sockets, downward elsewhere
    Stacked,
}

/// Configuration options for figure layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size given to nodes without persisted geometry (width, height)
    pub default_node_size: (f64, f64),

    /// Edge length of a socket marker
    pub socket_size: f64,

    /// Edge length of a parameter marker
    pub parameter_size: f64,

    /// Gap between consecutive parameters of a socket
    pub parameter_spacing: f64,

    /// Gap between a node's shape and its title
    pub title_offset: f64,

    /// Offset of the drop shadow (dx, dy)
    pub shadow_offset: (f64, f64),

    /// Inner padding between a node's shape and a scaled icon
    pub icon_padding: f64,

    /// Length of the straight segment leaving and entering a connector
    pub connection_stub: f64,

    /// Minimum separation between arranged socket angles
    pub angle_epsilon: f64,

    /// Distance from a parameter to its variable icon
    pub variable_offset: f64,

    /// Edge length of a variable icon
    pub variable_size: f64,

    /// Approximate label glyph width
    pub label_char_width: f64,

    /// Approximate label line height
    pub label_height: f64,

    /// Socket content arrangement
    pub display_mode: DisplayMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_node_size: (64.0, 64.0),
            socket_size: 10.0,
            parameter_size: 8.0,
            parameter_spacing: 14.0,
            title_offset: 6.0,
            shadow_offset: (3.0, 3.0),
            icon_padding: 8.0,
            connection_stub: 15.0,
            angle_epsilon: ANGLE_EPSILON,
            variable_offset: 24.0,
            variable_size: 16.0,
            label_char_width: 7.0,
            label_height: 14.0,
            display_mode: DisplayMode::Radial,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the default node size
    pub fn with_node_size(mut self, width: f64, height: f64) -> Self {
        self.default_node_size = (width, height);
        self
    }

    /// Set the socket display mode
    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = mode;
        self
    }

    /// Set the connector stub length
    pub fn with_connection_stub(mut self, length: f64) -> Self {
        self.connection_stub = length;
        self
    }

    /// Set the minimum socket angle separation
    pub fn with_angle_epsilon(mut self, epsilon: f64) -> Self {
        self.angle_epsilon = epsilon;
        self
    }

    /// Estimated rendered width of a label
    pub fn label_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.label_char_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.default_node_size, (64.0, 64.0));
        assert_eq!(config.angle_epsilon, 0.011);
        assert_eq!(config.display_mode, DisplayMode::Radial);
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_node_size(120.0, 60.0)
            .with_display_mode(DisplayMode::Stacked)
            .with_connection_stub(6.0)
            .with_angle_epsilon(0.05);

        assert_eq!(config.default_node_size, (120.0, 60.0));
        assert_eq!(config.display_mode, DisplayMode::Stacked);
        assert_eq!(config.connection_stub, 6.0);
        assert_eq!(config.angle_epsilon, 0.05);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
display_mode = "stacked"
socket_size = 12.0
"#,
        )
        .expect("Should parse");
        assert_eq!(config.display_mode, DisplayMode::Stacked);
        assert_eq!(config.socket_size, 12.0);
        assert_eq!(config.parameter_spacing, 14.0);
    }

    #[test]
    fn test_invalid_toml_error() {
        assert!(EngineConfig::from_toml("display_mode = [").is_err());
    }

    #[test]
    fn test_label_width_estimate() {
        assert_eq!(EngineConfig::default().label_width("abcd"), 28.0);
    }
}
