//! Output switches for the SVG renderer

/// What the renderer draws and how the document is written
#[derive(Debug, Clone)]
pub struct SvgConfig {
    /// Margin added on every side of the figure extent
    pub margin: f64,

    /// Emit an XML declaration so the file stands on its own
    pub standalone: bool,

    /// One element per line, indented by group depth
    pub pretty_print: bool,

    /// Prepended to every class name, e.g. `pf-` gives `pf-socket`
    pub class_prefix: Option<String>,

    /// Blurred drop shadow under each node
    pub shadows: bool,

    /// Socket titles and parameter labels
    pub labels: bool,

    /// Begin/commit/rollback marks on control-links
    pub transaction_glyphs: bool,

    /// Inline icon files as base64 images; otherwise only the icon name is drawn
    pub embed_icons: bool,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            margin: 20.0,
            standalone: true,
            pretty_print: true,
            class_prefix: Some("pf-".to_string()),
            shadows: true,
            labels: true,
            transaction_glyphs: true,
            embed_icons: true,
        }
    }
}

impl SvgConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = Some(prefix.into());
        self
    }

    pub fn without_class_prefix(mut self) -> Self {
        self.class_prefix = None;
        self
    }

    pub fn with_shadows(mut self, shadows: bool) -> Self {
        self.shadows = shadows;
        self
    }

    pub fn with_labels(mut self, labels: bool) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_transaction_glyphs(mut self, glyphs: bool) -> Self {
        self.transaction_glyphs = glyphs;
        self
    }

    pub fn with_embed_icons(mut self, embed: bool) -> Self {
        self.embed_icons = embed;
        self
    }

    /// Bare outline: no shadows, labels, glyphs or embedded images
    pub fn outline() -> Self {
        Self {
            shadows: false,
            labels: false,
            transaction_glyphs: false,
            embed_icons: false,
            ..Self::default()
        }
    }
}
