//! SVG generation from diagram figures

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::figure::{ConnectionFigure, Diagram, FigureId, NodeFigure};
use crate::geometry::{BoundingBox, Point, ShapeKind};
use crate::model::DomainModel;
use crate::routing::{arrowhead, midpoint};
use crate::skin::{IconSpec, LinkStyle, Skin, SymbolStyle};

use super::SvgConfig;

/// Corner radius of rounded rectangles
const CORNER_RADIUS: f64 = 8.0;

/// Radius of the disc behind a transaction-control glyph
const GLYPH_RADIUS: f64 = 7.0;

/// Build SVG elements incrementally
pub struct SvgBuilder {
    config: SvgConfig,
    defs: Vec<String>,
    elements: Vec<String>,
    connections: Vec<String>,
    indent: usize,
}

impl SvgBuilder {
    /// Create a new SVG builder
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            defs: vec![],
            elements: vec![],
            connections: vec![],
            indent: 1,
        }
    }

    fn prefix(&self) -> String {
        self.config.class_prefix.clone().unwrap_or_default()
    }

    fn indent_str(&self) -> String {
        if self.config.pretty_print {
            "  ".repeat(self.indent)
        } else {
            String::new()
        }
    }

    fn newline(&self) -> &str {
        if self.config.pretty_print {
            "\n"
        } else {
            ""
        }
    }

    fn class_list(&self, classes: &[&str]) -> String {
        let prefix = self.prefix();
        classes
            .iter()
            .map(|c| format!("{}{}", prefix, c))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Add the drop shadow filter used by node shadows
    pub fn add_shadow_filter(&mut self) {
        let prefix = self.prefix();
        self.defs.push(format!(
            r#"<filter id="{prefix}blur" x="-10%" y="-10%" width="120%" height="120%"><feGaussianBlur stdDeviation="1.5"/></filter>"#
        ));
    }

    /// Add a presentation shape filling `bounds`
    pub fn add_shape(
        &mut self,
        shape: ShapeKind,
        bounds: &BoundingBox,
        classes: &[&str],
        styles: &str,
    ) {
        let class_list = self.class_list(classes);
        let b = bounds;
        let element = match shape {
            ShapeKind::Rectangle => format!(
                r#"<rect class="{}" x="{}" y="{}" width="{}" height="{}"{}/>"#,
                class_list, b.x, b.y, b.width, b.height, styles
            ),
            ShapeKind::RoundedRectangle => {
                let r = CORNER_RADIUS.min(b.width / 2.0).min(b.height / 2.0);
                format!(
                    r#"<rect class="{}" x="{}" y="{}" width="{}" height="{}" rx="{}" ry="{}"{}/>"#,
                    class_list, b.x, b.y, b.width, b.height, r, r, styles
                )
            }
            ShapeKind::Ellipse => {
                let c = b.center();
                format!(
                    r#"<ellipse class="{}" cx="{}" cy="{}" rx="{}" ry="{}"{}/>"#,
                    class_list,
                    c.x,
                    c.y,
                    b.width / 2.0,
                    b.height / 2.0,
                    styles
                )
            }
            ShapeKind::Diamond => {
                let c = b.center();
                let points = [
                    Point::new(c.x, b.y),
                    Point::new(b.right(), c.y),
                    Point::new(c.x, b.bottom()),
                    Point::new(b.x, c.y),
                ];
                format!(
                    r#"<polygon class="{}" points="{}"{}/>"#,
                    class_list,
                    points_attr(&points),
                    styles
                )
            }
        };
        self.elements
            .push(format!("{}{}", self.indent_str(), element));
    }

    /// Add an embedded image
    pub fn add_image(&mut self, bounds: &BoundingBox, href: &str) {
        self.elements.push(format!(
            r#"{}<image class="{}" x="{}" y="{}" width="{}" height="{}" href="{}" preserveAspectRatio="xMidYMid meet"/>"#,
            self.indent_str(),
            self.class_list(&["icon"]),
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height,
            href
        ));
    }

    /// Add a text element centered vertically on `y`
    pub fn add_text(&mut self, text: &str, x: f64, y: f64, anchor: &str, classes: &[&str]) {
        self.elements.push(format!(
            r#"{}<text class="{}" x="{}" y="{}" text-anchor="{}" dominant-baseline="middle">{}</text>"#,
            self.indent_str(),
            self.class_list(classes),
            x,
            y,
            anchor,
            escape_xml(text)
        ));
    }

    /// Add a path for a connection
    pub fn add_connection_path(&mut self, path: &[Point], classes: &[&str], styles: &str) {
        self.connections.push(format!(
            r#"{}<path class="{}" d="{}" fill="none"{}/>"#,
            self.indent_str(),
            self.class_list(classes),
            path_to_d(path),
            styles
        ));
    }

    /// Add a filled arrowhead on top of the connections
    pub fn add_arrowhead(&mut self, points: &[Point; 3], fill: &str) {
        self.connections.push(format!(
            r#"{}<polygon class="{}" points="{}" fill="{}"/>"#,
            self.indent_str(),
            self.class_list(&["arrow"]),
            points_attr(points),
            fill
        ));
    }

    /// Add a lettered disc at a point of a connection
    pub fn add_glyph(&mut self, at: Point, glyph: &str, stroke: &str) {
        let indent = self.indent_str();
        self.connections.push(format!(
            r##"{}<circle class="{}" cx="{}" cy="{}" r="{}" fill="#ffffff" stroke="{}"/>"##,
            indent,
            self.class_list(&["glyph"]),
            at.x,
            at.y,
            GLYPH_RADIUS,
            stroke
        ));
        self.connections.push(format!(
            r#"{}<text class="{}" x="{}" y="{}" text-anchor="middle" dominant-baseline="central">{}</text>"#,
            indent,
            self.class_list(&["glyph-text"]),
            at.x,
            at.y,
            escape_xml(glyph)
        ));
    }

    /// Add a group element with optional ID and classes
    pub fn start_group(&mut self, id: Option<&str>, classes: &[&str]) {
        let id_attr = id
            .map(|i| format!(r#" id="{}""#, escape_xml(i)))
            .unwrap_or_default();
        let class_attr = if classes.is_empty() {
            String::new()
        } else {
            format!(r#" class="{}""#, self.class_list(classes))
        };

        self.elements
            .push(format!("{}<g{}{}>", self.indent_str(), id_attr, class_attr));
        self.indent += 1;
    }

    /// Close a group element
    pub fn end_group(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.elements.push(format!("{}</g>", self.indent_str()));
    }

    /// Build the final SVG string
    pub fn build(self, viewbox: BoundingBox) -> String {
        let padding = self.config.margin;
        let vb_x = viewbox.x - padding;
        let vb_y = viewbox.y - padding;
        let vb_w = viewbox.width + 2.0 * padding;
        let vb_h = viewbox.height + 2.0 * padding;

        let nl = self.newline();

        let mut svg = String::new();

        if self.config.standalone {
            svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
            svg.push_str(nl);
        }

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
            vb_x, vb_y, vb_w, vb_h
        ));
        svg.push_str(nl);

        if !self.defs.is_empty() {
            svg.push_str("  <defs>");
            svg.push_str(nl);
            for def in &self.defs {
                svg.push_str("    ");
                svg.push_str(def);
                svg.push_str(nl);
            }
            svg.push_str("  </defs>");
            svg.push_str(nl);
        }

        for elem in &self.elements {
            svg.push_str(elem);
            svg.push_str(nl);
        }

        // Connections are drawn over the nodes
        for conn in &self.connections {
            svg.push_str(conn);
            svg.push_str(nl);
        }

        svg.push_str("</svg>");

        svg
    }
}

/// Render the figures of a diagram to an SVG string
pub fn render_svg<M: DomainModel>(diagram: &Diagram<M>, skin: &Skin, config: &SvgConfig) -> String {
    let mut builder = SvgBuilder::new(config.clone());
    if config.shadows && !diagram.nodes().is_empty() {
        builder.add_shadow_filter();
    }

    let mut viewbox: Option<BoundingBox> = None;
    let mut extend = |bounds: BoundingBox| {
        viewbox = Some(match viewbox {
            Some(v) => v.union(&bounds),
            None => bounds,
        });
    };

    for &id in diagram.nodes() {
        let Ok(node) = diagram.node(id) else {
            continue;
        };
        render_node(diagram, id, node, skin, &mut builder);
        if let Ok(bounds) = diagram.bounds(id) {
            extend(bounds);
        }
    }

    for &id in diagram.links() {
        let Ok(connection) = diagram.connection(id) else {
            continue;
        };
        render_connection(connection, &skin.link(connection.kind), &mut builder);
        if let Some(bounds) = BoundingBox::enclosing(&connection.path) {
            extend(bounds);
        }
    }

    builder.build(viewbox.unwrap_or_default())
}

/// Render a node with its sockets, parameters and variable icons
fn render_node<M: DomainModel>(
    diagram: &Diagram<M>,
    id: FigureId,
    node: &NodeFigure,
    skin: &Skin,
    builder: &mut SvgBuilder,
) {
    let style = skin.symbol(&node.symbol);
    let element = diagram.element_of(id).map(|e| e.as_str());
    builder.start_group(element, &["node", node.symbol.as_str()]);

    if builder.config.shadows {
        let filter = format!(
            r##" fill="#000000" fill-opacity="0.25" filter="url(#{}blur)""##,
            builder.prefix()
        );
        builder.add_shape(node.shape, &node.shadow, &["shadow"], &filter);
    }

    let fill = node
        .fill
        .map(|c| c.to_hex())
        .unwrap_or_else(|| style.fill.clone());
    builder.add_shape(
        node.shape,
        &node.presentation,
        &["shape"],
        &shape_styles(&fill, &style),
    );

    if let Some(icon) = &node.icon {
        let href = if builder.config.embed_icons {
            skin.icon(&node.symbol).and_then(icon_data_uri)
        } else {
            None
        };
        match href {
            Some(href) => builder.add_image(&icon.bounds, &href),
            None => {
                let c = icon.bounds.center();
                builder.add_text(&icon.name, c.x, c.y, "middle", &["icon-name"]);
            }
        }
    }

    if let Some(title) = &node.title {
        let c = title.bounds.center();
        builder.add_text(&title.text, c.x, c.y, "middle", &["title"]);
    }

    let socket_style = skin.symbol("socket");
    let param_style = skin.symbol("parameter");
    let variable_style = skin.symbol("variable");
    for &socket_id in &node.sockets {
        let Ok(socket) = diagram.socket(socket_id) else {
            continue;
        };
        let fill = socket
            .fill
            .map(|c| c.to_hex())
            .unwrap_or_else(|| socket_style.fill.clone());
        builder.add_shape(
            socket_style.shape,
            &socket.marker,
            &["socket", socket.direction.as_str()],
            &shape_styles(&fill, &socket_style),
        );
        if builder.config.labels && !socket.title.is_empty() {
            let c = socket.title_bounds.center();
            builder.add_text(&socket.title, c.x, c.y, "middle", &["socket-title"]);
        }

        for &param_id in &socket.params {
            let Ok(param) = diagram.parameter(param_id) else {
                continue;
            };
            builder.add_shape(
                param_style.shape,
                &param.marker,
                &["parameter"],
                &shape_styles(&param_style.fill, &param_style),
            );
            if builder.config.labels {
                let label = &param.label_bounds;
                builder.add_text(&param.label, label.x, label.center().y, "start", &["parameter-label"]);
            }

            let variable = param
                .variable_link
                .and_then(|link| diagram.variable(link.variable).ok());
            if let Some(variable) = variable {
                builder.add_shape(
                    variable_style.shape,
                    &variable.bounds,
                    &["variable"],
                    &shape_styles(&variable_style.fill, &variable_style),
                );
            }
        }
    }

    builder.end_group();
}

/// Render a connection with its arrowhead and transaction glyph
fn render_connection(connection: &ConnectionFigure, style: &LinkStyle, builder: &mut SvgBuilder) {
    if connection.path.len() < 2 {
        return;
    }
    builder.add_connection_path(
        &connection.path,
        &["connection", connection.kind.as_str()],
        &link_styles(style),
    );
    if let Some(head) = arrowhead(&connection.path) {
        builder.add_arrowhead(&head, &style.stroke);
    }
    if !builder.config.transaction_glyphs {
        return;
    }
    if let (Some(control), Some(at)) = (connection.transaction, midpoint(&connection.path)) {
        builder.add_glyph(at, control.glyph(), &style.stroke);
    }
}

/// Read an icon file into a `data:` URI; unreadable files are skipped with a warning
fn icon_data_uri(icon: &IconSpec) -> Option<String> {
    let path = icon.file.as_deref()?;
    match std::fs::read(path) {
        Ok(data) => Some(format!(
            "data:{};base64,{}",
            mime_type(path),
            BASE64_STANDARD.encode(data)
        )),
        Err(err) => {
            tracing::warn!(icon = %icon.name, path = %path.display(), %err, "cannot read icon file");
            None
        }
    }
}

fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn shape_styles(fill: &str, style: &SymbolStyle) -> String {
    format!(
        r#" fill="{}" stroke="{}" stroke-width="{}""#,
        fill, style.stroke, style.stroke_width
    )
}

fn link_styles(style: &LinkStyle) -> String {
    let mut parts = vec![
        format!(r#" stroke="{}""#, style.stroke),
        format!(r#" stroke-width="{}""#, style.stroke_width),
    ];
    if let Some(dash) = &style.dasharray {
        parts.push(format!(r#" stroke-dasharray="{}""#, dash));
    }
    parts.join("")
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a path of points to an SVG path d attribute
fn path_to_d(path: &[Point]) -> String {
    if path.is_empty() {
        return String::new();
    }

    let mut d = format!("M{} {}", path[0].x, path[0].y);
    for point in &path[1..] {
        d.push_str(&format!(" L{} {}", point.x, point.y));
    }
    d
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
