//! Node figures and the operations that cascade to their sockets

use crate::angle::{
    boundary_point, direction, flip_angle, normalize_angle, rotate_angle, FlipAxis,
    RotationDirection,
};
use crate::codec::{quantize_angle, AttributeSet};
use crate::config::EngineConfig;
use crate::error::FigureError;
use crate::geometry::{BoundingBox, Point, Rgb, ShapeKind};
use crate::model::{DomainModel, ElementId};

use super::socket::{SocketDirection, SocketFigure};
use super::{Diagram, Figure, FigureId, FigureKind};

/// Icon drawn inside a node
#[derive(Debug, Clone, PartialEq)]
pub struct IconPart {
    pub name: String,
    /// Native width and height
    pub native: (f64, f64),
    pub bounds: BoundingBox,
}

/// Title text of a node
#[derive(Debug, Clone, PartialEq)]
pub struct TitlePart {
    pub text: String,
    pub bounds: BoundingBox,
}

/// A process step: presentation shape plus its parts and sockets
#[derive(Debug, Clone)]
pub struct NodeFigure {
    /// Symbol-type name used for skin lookup
    pub symbol: String,
    pub shape: ShapeKind,
    pub presentation: BoundingBox,
    pub shadow: BoundingBox,
    pub icon: Option<IconPart>,
    pub title: Option<TitlePart>,
    pub fill: Option<Rgb>,
    /// Keep the icon at its native size
    pub no_resize: bool,
    /// Angle of a rotating title; `None` puts the title below the shape
    pub name_angle: Option<f64>,
    pub sockets: Vec<FigureId>,
    bounds: BoundingBox,
}

impl NodeFigure {
    fn new(symbol: &str, shape: ShapeKind, presentation: BoundingBox) -> Self {
        Self {
            symbol: symbol.to_string(),
            shape,
            presentation,
            shadow: presentation,
            icon: None,
            title: None,
            fill: None,
            no_resize: false,
            name_angle: None,
            sockets: Vec::new(),
            bounds: presentation,
        }
    }

    /// Union of the shape, icon and title, without sockets
    fn own_bounds(&self) -> BoundingBox {
        let mut bounds = self.presentation;
        if let Some(icon) = &self.icon {
            bounds = bounds.union(&icon.bounds);
        }
        if let Some(title) = &self.title {
            bounds = bounds.union(&title.bounds);
        }
        bounds
    }

    /// Place shadow, icon and title around the current presentation box
    fn layout_parts(&mut self, config: &EngineConfig) {
        let (sx, sy) = config.shadow_offset;
        self.shadow = self.presentation.translated(sx, sy);

        let center = self.presentation.center();
        if let Some(icon) = &mut self.icon {
            let (nw, nh) = icon.native;
            let (w, h) = if self.no_resize || nw <= 0.0 || nh <= 0.0 {
                (nw, nh)
            } else {
                let available_w = (self.presentation.width - 2.0 * config.icon_padding).max(0.0);
                let available_h = (self.presentation.height - 2.0 * config.icon_padding).max(0.0);
                let scale = (available_w / nw).min(available_h / nh);
                (nw * scale, nh * scale)
            };
            icon.bounds = BoundingBox::centered_at(center, w, h);
        }

        if let Some(title) = &mut self.title {
            let width = config.label_width(&title.text);
            let height = config.label_height;
            title.bounds = match self.name_angle {
                None => BoundingBox::new(
                    center.x - width / 2.0,
                    self.presentation.bottom() + config.title_offset,
                    width,
                    height,
                ),
                Some(angle) => {
                    let edge = boundary_point(self.shape, &self.presentation, angle);
                    place_outward(edge, direction(angle), config.title_offset, width, height)
                }
            };
        }
    }
}

impl Figure for NodeFigure {
    fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.presentation = self.presentation.translated(dx, dy);
        self.shadow = self.shadow.translated(dx, dy);
        if let Some(icon) = &mut self.icon {
            icon.bounds = icon.bounds.translated(dx, dy);
        }
        if let Some(title) = &mut self.title {
            title.bounds = title.bounds.translated(dx, dy);
        }
        self.bounds = self.bounds.translated(dx, dy);
    }

    fn encode(&self) -> AttributeSet {
        let center = self.presentation.center();
        AttributeSet {
            origin: Some((center.x.round() as i64, center.y.round() as i64)),
            size: Some((
                self.presentation.width.round() as i64,
                self.presentation.height.round() as i64,
            )),
            fill_color: self.fill,
            name_angle: self.name_angle.map(quantize_angle),
            ..AttributeSet::default()
        }
    }

    fn decode(&mut self, attributes: &AttributeSet) {
        let center = attributes
            .origin
            .map(|(x, y)| Point::new(x as f64, y as f64))
            .unwrap_or_else(|| self.presentation.center());
        let (width, height) = attributes
            .size
            .map(|(w, h)| (w.max(0) as f64, h.max(0) as f64))
            .unwrap_or((self.presentation.width, self.presentation.height));
        self.presentation = BoundingBox::centered_at(center, width, height);
        if attributes.fill_color.is_some() {
            self.fill = attributes.fill_color;
        }
        if let Some(angle) = attributes.name_angle {
            self.name_angle = Some(normalize_angle(angle));
        }
    }
}

/// Box of the given size just outside `point`, pushed away along `dir`
pub(super) fn place_outward(
    point: Point,
    dir: (f64, f64),
    gap: f64,
    width: f64,
    height: f64,
) -> BoundingBox {
    let (dx, dy) = dir;
    let near = point.translated(dx * gap, dy * gap);
    let center = near.translated(dx * width / 2.0, dy * height / 2.0);
    BoundingBox::centered_at(center, width, height)
}

impl<M: DomainModel> Diagram<M> {
    /// Create the figure for a domain node, restoring its persisted geometry
    pub fn add_node(
        &mut self,
        element: &ElementId,
        symbol: &str,
        shape: ShapeKind,
    ) -> Result<FigureId, FigureError> {
        let attributes = self.stored_attributes(element);
        let (width, height) = self.config.default_node_size;
        let mut node = NodeFigure::new(symbol, shape, BoundingBox::new(0.0, 0.0, width, height));
        node.decode(&attributes);
        node.layout_parts(&self.config);
        node.bounds = node.own_bounds();

        let id = self.insert_figure(
            Some(element.clone()),
            FigureKind::Node(node),
            attributes.passthrough,
        )?;
        self.nodes.push(id);
        self.persist(id)?;
        self.mark_changed(id);
        tracing::debug!(%element, figure = %id, symbol, "added node");
        Ok(id)
    }

    /// Remove a node with its sockets, parameters and connections
    pub fn remove_node(&mut self, node: FigureId) -> Result<(), FigureError> {
        let sockets = self.node(node)?.sockets.clone();
        for socket in sockets {
            self.remove_socket(node, socket)?;
        }
        self.remove_figure(node)?;
        self.nodes.retain(|&n| n != node);
        tracing::debug!(figure = %node, "removed node");
        Ok(())
    }

    /// Resize the presentation shape about its center
    pub fn resize(&mut self, node: FigureId, width: f64, height: f64) -> Result<(), FigureError> {
        self.invalidate(node);
        {
            let figure = self.node_mut(node)?;
            figure.presentation = figure
                .presentation
                .resized_about_center(width.max(0.0), height.max(0.0));
        }
        self.relayout_node(node)?;
        self.persist(node)?;
        self.mark_changed(node);
        let moved = self.family(node)?;
        self.propagate(&moved)
    }

    /// Translate a node and everything it carries.
    ///
    /// All parts move before any dependent connection is re-laid out.
    pub fn move_by(&mut self, node: FigureId, dx: f64, dy: f64) -> Result<(), FigureError> {
        self.node(node)?;
        let moved = self.family(node)?;
        self.invalidate(node);
        for &id in &moved {
            self.kind_mut(id)?.translate(dx, dy);
        }
        self.persist(node)?;
        self.mark_changed(node);
        self.propagate(&moved)
    }

    /// Set the fill color of a node and its sockets; `None` restores the skin color
    pub fn colorize(&mut self, node: FigureId, color: Option<Rgb>) -> Result<(), FigureError> {
        self.invalidate(node);
        let sockets = {
            let figure = self.node_mut(node)?;
            figure.fill = color;
            figure.sockets.clone()
        };
        for socket in sockets {
            self.socket_mut(socket)?.fill = color;
            self.persist(socket)?;
        }
        self.persist(node)?;
        self.mark_changed(node);
        Ok(())
    }

    /// Turn every tag of the node by a quarter turn
    pub fn rotate(&mut self, node: FigureId, direction: RotationDirection) -> Result<(), FigureError> {
        self.reorient(node, |angle| rotate_angle(angle, direction))
    }

    /// Mirror every tag of the node across an axis
    pub fn flip(&mut self, node: FigureId, axis: FlipAxis) -> Result<(), FigureError> {
        self.reorient(node, |angle| flip_angle(angle, axis))
    }

    fn reorient(&mut self, node: FigureId, map: impl Fn(f64) -> f64) -> Result<(), FigureError> {
        self.invalidate(node);
        let sockets = {
            let figure = self.node_mut(node)?;
            figure.name_angle = figure.name_angle.map(&map);
            figure.sockets.clone()
        };
        for &socket in &sockets {
            let figure = self.socket_mut(socket)?;
            figure.angle = map(figure.angle);
            figure.arranged = true;
        }
        self.relayout_node(node)?;
        for &socket in &sockets {
            self.persist(socket)?;
        }
        self.persist(node)?;
        self.mark_changed(node);
        let moved = self.family(node)?;
        self.propagate(&moved)
    }

    /// Set or clear the node title
    pub fn set_title(&mut self, node: FigureId, text: Option<&str>) -> Result<(), FigureError> {
        self.invalidate(node);
        self.node_mut(node)?.title = text.map(|text| TitlePart {
            text: text.to_string(),
            bounds: BoundingBox::zero(),
        });
        self.relayout_node(node)?;
        self.mark_changed(node);
        Ok(())
    }

    /// Set the angle of a rotating title; `None` puts it back below the shape
    pub fn set_name_angle(&mut self, node: FigureId, angle: Option<f64>) -> Result<(), FigureError> {
        self.invalidate(node);
        self.node_mut(node)?.name_angle = angle.map(normalize_angle);
        self.relayout_node(node)?;
        self.persist(node)?;
        self.mark_changed(node);
        Ok(())
    }

    /// Set or clear the icon, given its native size
    pub fn set_icon(
        &mut self,
        node: FigureId,
        icon: Option<(&str, f64, f64)>,
    ) -> Result<(), FigureError> {
        self.invalidate(node);
        self.node_mut(node)?.icon = icon.map(|(name, width, height)| IconPart {
            name: name.to_string(),
            native: (width, height),
            bounds: BoundingBox::zero(),
        });
        self.relayout_node(node)?;
        self.mark_changed(node);
        Ok(())
    }

    /// Keep the icon at native size instead of scaling it to the shape
    pub fn set_no_resize(&mut self, node: FigureId, no_resize: bool) -> Result<(), FigureError> {
        self.invalidate(node);
        self.node_mut(node)?.no_resize = no_resize;
        self.relayout_node(node)?;
        self.mark_changed(node);
        Ok(())
    }

    /// Create the figure for a domain socket on a node
    pub fn add_socket(
        &mut self,
        node: FigureId,
        element: &ElementId,
        direction: SocketDirection,
    ) -> Result<FigureId, FigureError> {
        self.node(node)?;
        let attributes = self.stored_attributes(element);
        let mut socket = SocketFigure::new(node, direction, element.as_str());
        socket.decode(&attributes);

        let id = self.insert_figure(
            Some(element.clone()),
            FigureKind::Socket(socket),
            attributes.passthrough,
        )?;
        self.node_mut(node)?.sockets.push(id);
        self.reconcile_params(id)?;
        self.layout_socket(id)?;
        self.refresh_node_bounds(node)?;
        self.persist(id)?;
        self.mark_changed(id);
        tracing::debug!(%element, figure = %id, node = %node, ?direction, "added socket");
        Ok(id)
    }

    /// Remove a socket after releasing its connections and variable links
    pub fn remove_socket(&mut self, node: FigureId, socket: FigureId) -> Result<(), FigureError> {
        let params = self.socket(socket)?.params.clone();
        if !self.node(node)?.sockets.contains(&socket) {
            return Err(FigureError::not_owned(socket, node));
        }

        for param in params {
            if self.parameter(param)?.variable_link.is_some() {
                self.remove_variable_link(param)?;
            }
            for connection in self.connections_of(param) {
                self.disconnect(connection)?;
            }
            self.remove_figure(param)?;
        }
        for connection in self.connections_of(socket) {
            self.disconnect(connection)?;
        }

        self.remove_figure(socket)?;
        self.node_mut(node)?.sockets.retain(|&s| s != socket);
        self.refresh_node_bounds(node)?;
        self.mark_changed(node);
        tracing::debug!(figure = %socket, node = %node, "removed socket");
        Ok(())
    }

    /// Re-place the node's parts and every socket
    pub(super) fn relayout_node(&mut self, node: FigureId) -> Result<(), FigureError> {
        let config = self.config.clone();
        let sockets = {
            let figure = self.node_mut(node)?;
            figure.layout_parts(&config);
            figure.sockets.clone()
        };
        for socket in sockets {
            self.layout_socket(socket)?;
        }
        self.refresh_node_bounds(node)
    }

    /// Recompute the node bounds as the union of its parts and sockets
    pub(super) fn refresh_node_bounds(&mut self, node: FigureId) -> Result<(), FigureError> {
        let figure = self.node(node)?;
        let mut bounds = figure.own_bounds();
        for &socket in &figure.sockets {
            bounds = bounds.union(&self.socket(socket)?.bounds());
        }
        self.node_mut(node)?.bounds = bounds;
        Ok(())
    }
}
