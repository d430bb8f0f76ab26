//! Skin lookup for symbol and link styles
//!
//! A skin maps symbol-type names (e.g. `activity`, `decision`) and link kinds
//! to the shape, colors and icon used to draw them. Skins are TOML documents;
//! an embedded default skin backs every lookup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::geometry::ShapeKind;
use crate::model::LinkKind;

/// Errors that can occur when loading or parsing skins
#[derive(Error, Debug)]
pub enum SkinError {
    #[error("Failed to read skin file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse skin TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Icon drawn inside a node
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IconSpec {
    pub name: String,
    /// Native width
    pub width: f64,
    /// Native height
    pub height: f64,
    /// Raster file embedded by the SVG renderer, if any
    pub file: Option<PathBuf>,
}

/// Drawing style for a symbol type
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SymbolStyle {
    pub shape: ShapeKind,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
    pub icon: Option<IconSpec>,
}

impl Default for SymbolStyle {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Rectangle,
            fill: "#f0f0f0".to_string(),
            stroke: "#333333".to_string(),
            stroke_width: 1.5,
            icon: None,
        }
    }
}

/// Drawing style for a link kind
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkStyle {
    pub stroke: String,
    pub stroke_width: f64,
    pub dasharray: Option<String>,
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self {
            stroke: "#333333".to_string(),
            stroke_width: 1.5,
            dasharray: None,
        }
    }
}

/// A skin mapping symbol types and link kinds to styles
#[derive(Debug, Clone)]
pub struct Skin {
    /// Optional name for the skin
    pub name: Option<String>,
    /// Optional description
    pub description: Option<String>,
    /// Symbol styles by symbol-type name
    pub symbols: HashMap<String, SymbolStyle>,
    /// Link styles by link-kind name
    pub links: HashMap<String, LinkStyle>,
}

/// TOML structure for deserializing skins
#[derive(Deserialize)]
struct TomlSkin {
    metadata: Option<TomlMetadata>,
    #[serde(default)]
    symbols: HashMap<String, SymbolStyle>,
    #[serde(default)]
    links: HashMap<String, LinkStyle>,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
    description: Option<String>,
}

/// Default skin - neutral grays with a blue control flow and orange data flow
const DEFAULT_SKIN: &str = r##"
[symbols.default]
shape = "rectangle"
fill = "#f5f5f5"
stroke = "#333333"

[symbols.activity]
shape = "rounded_rectangle"
fill = "#e3f2fd"
stroke = "#1565c0"

[symbols.start]
shape = "ellipse"
fill = "#e8f5e9"
stroke = "#2e7d32"

[symbols.end]
shape = "ellipse"
fill = "#ffebee"
stroke = "#c62828"
stroke_width = 3.0

[symbols.decision]
shape = "diamond"
fill = "#fff3e0"
stroke = "#e65100"

[symbols.socket]
shape = "ellipse"
fill = "#ffffff"
stroke = "#333333"

[symbols.parameter]
shape = "rectangle"
fill = "#fff8e1"
stroke = "#ff8f00"
stroke_width = 1.0

[symbols.variable]
shape = "diamond"
fill = "#f3e5f5"
stroke = "#6a1b9a"
stroke_width = 1.0

[links.control]
stroke = "#1565c0"
stroke_width = 2.0

[links.data]
stroke = "#ff8f00"
stroke_width = 1.5
dasharray = "6,3"

[links.variable]
stroke = "#6a1b9a"
stroke_width = 1.0
dasharray = "2,2"
"##;

impl Skin {
    /// Load skin from TOML file
    pub fn from_file(path: &Path) -> Result<Self, SkinError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load skin from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SkinError> {
        let parsed: TomlSkin = toml::from_str(content)?;

        Ok(Skin {
            name: parsed.metadata.as_ref().and_then(|m| m.name.clone()),
            description: parsed.metadata.as_ref().and_then(|m| m.description.clone()),
            symbols: parsed.symbols,
            links: parsed.links,
        })
    }

    /// Style for a symbol type.
    ///
    /// Fallback order:
    /// 1. This skin's entry for the symbol
    /// 2. This skin's `default` entry
    /// 3. The embedded skin's entry for the symbol, then its `default`
    pub fn symbol(&self, name: &str) -> SymbolStyle {
        if let Some(style) = self.symbols.get(name).or_else(|| self.symbols.get("default")) {
            return style.clone();
        }
        let fallback = Self::default();
        fallback
            .symbols
            .get(name)
            .or_else(|| fallback.symbols.get("default"))
            .cloned()
            .unwrap_or_default()
    }

    /// Style for a link kind, falling back to the embedded skin
    pub fn link(&self, kind: LinkKind) -> LinkStyle {
        if let Some(style) = self.links.get(kind.as_str()) {
            return style.clone();
        }
        Self::default()
            .links
            .get(kind.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Icon registered for a symbol type, without falling back to `default`
    pub fn icon(&self, name: &str) -> Option<&IconSpec> {
        self.symbols.get(name).and_then(|s| s.icon.as_ref())
    }
}

impl Default for Skin {
    fn default() -> Self {
        Self::from_toml(DEFAULT_SKIN).expect("Default skin should be valid TOML")
    }
}
