//! SVG renderer for diagrams
//!
//! This module draws the current figure geometry of a [`crate::Diagram`]
//! using a [`crate::Skin`] for shapes and colors.

pub mod config;
pub mod svg;

pub use config::SvgConfig;
pub use svg::render_svg;
