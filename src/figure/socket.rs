//! Socket figures: tags on a node boundary hosting ordered parameters

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::Deserialize;

use crate::angle::{boundary_point, direction, normalize_angle, side_of};
use crate::codec::{quantize_angle, AttributeSet};
use crate::config::DisplayMode;
use crate::error::FigureError;
use crate::geometry::{BoundingBox, Point, Rgb, Side};
use crate::model::{DomainModel, ElementId};

use super::node::place_outward;
use super::parameter::ParameterFigure;
use super::{Diagram, Figure, FigureId, FigureKind};

/// Whether control enters or leaves a node through a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketDirection {
    Entry,
    Exit,
}

impl SocketDirection {
    /// Angle used until the socket is arranged: entries on top, exits below
    pub fn default_angle(&self) -> f64 {
        match self {
            SocketDirection::Entry => PI / 2.0,
            SocketDirection::Exit => 3.0 * PI / 2.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SocketDirection::Entry => "entry",
            SocketDirection::Exit => "exit",
        }
    }
}

/// An entry or exit point on a node's boundary
#[derive(Debug, Clone)]
pub struct SocketFigure {
    pub node: FigureId,
    pub direction: SocketDirection,
    /// Boundary angle in `[0, 2π)`
    pub angle: f64,
    /// Whether the angle was persisted or placed, as opposed to defaulted
    pub arranged: bool,
    pub fill: Option<Rgb>,
    pub title: String,
    /// Point on the node outline the socket sits on
    pub anchor: Point,
    pub marker: BoundingBox,
    pub title_bounds: BoundingBox,
    /// Parameter figures in domain order
    pub params: Vec<FigureId>,
    /// Show hidden domain parameters too
    pub show_all: bool,
    bounds: BoundingBox,
}

impl SocketFigure {
    pub(super) fn new(node: FigureId, direction: SocketDirection, title: &str) -> Self {
        Self {
            node,
            direction,
            angle: direction.default_angle(),
            arranged: false,
            fill: None,
            title: title.to_string(),
            anchor: Point::new(0.0, 0.0),
            marker: BoundingBox::zero(),
            title_bounds: BoundingBox::zero(),
            params: Vec::new(),
            show_all: false,
            bounds: BoundingBox::zero(),
        }
    }
}

impl Figure for SocketFigure {
    fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.anchor = self.anchor.translated(dx, dy);
        self.marker = self.marker.translated(dx, dy);
        self.title_bounds = self.title_bounds.translated(dx, dy);
        self.bounds = self.bounds.translated(dx, dy);
    }

    fn encode(&self) -> AttributeSet {
        AttributeSet {
            fill_color: self.fill,
            angle: self.arranged.then(|| quantize_angle(self.angle)),
            ..AttributeSet::default()
        }
    }

    fn decode(&mut self, attributes: &AttributeSet) {
        if let Some(angle) = attributes.angle {
            self.angle = normalize_angle(angle);
            self.arranged = true;
        }
        if attributes.fill_color.is_some() {
            self.fill = attributes.fill_color;
        }
    }
}

impl<M: DomainModel> Diagram<M> {
    /// Place a socket at a boundary angle; the socket counts as arranged afterwards
    pub fn set_angle(&mut self, socket: FigureId, angle: f64) -> Result<(), FigureError> {
        self.invalidate(socket);
        let node = {
            let figure = self.socket_mut(socket)?;
            figure.angle = normalize_angle(angle);
            figure.arranged = true;
            figure.node
        };
        self.layout_socket(socket)?;
        self.refresh_node_bounds(node)?;
        self.persist(socket)?;
        self.mark_changed(socket);
        let moved = self.family(socket)?;
        self.propagate(&moved)
    }

    /// Side of its node a socket faces
    pub fn socket_side(&self, socket: FigureId) -> Result<Side, FigureError> {
        let figure = self.socket(socket)?;
        let node = self.node(figure.node)?;
        Ok(side_of(figure.angle, &node.presentation))
    }

    pub fn set_socket_title(&mut self, socket: FigureId, title: &str) -> Result<(), FigureError> {
        self.invalidate(socket);
        self.socket_mut(socket)?.title = title.to_string();
        self.refresh_socket(socket)
    }

    /// Insert a new domain parameter and its figure.
    ///
    /// `position` is 1-based in the domain list; `None` appends.
    pub fn add_param(
        &mut self,
        socket: FigureId,
        element: &ElementId,
        position: Option<usize>,
    ) -> Result<FigureId, FigureError> {
        let socket_element = self.socket_element(socket)?;
        let len = self.model.parameters(&socket_element).len();
        let index = match position {
            None => len,
            Some(p) if (1..=len + 1).contains(&p) => p - 1,
            Some(p) => return Err(FigureError::IndexOutOfRange { index: p, len }),
        };
        if self.by_element.contains_key(element) {
            return Err(FigureError::DuplicateElement(element.clone()));
        }

        self.model.insert_parameter(&socket_element, element, index)?;
        self.invalidate(socket);
        self.reconcile_params(socket)?;
        self.refresh_socket(socket)?;
        tracing::debug!(%element, socket = %socket, index, "added parameter");
        self.param_figure(socket, element)
    }

    /// Show an existing domain parameter, or add it at the end when the socket lacks it
    pub(crate) fn attach_param(
        &mut self,
        socket: FigureId,
        element: &ElementId,
    ) -> Result<FigureId, FigureError> {
        let socket_element = self.socket_element(socket)?;
        let known = self
            .model
            .parameters(&socket_element)
            .iter()
            .any(|p| &p.element == element);
        if !known {
            return self.add_param(socket, element, None);
        }
        if let Some(existing) = self.figure_for(element) {
            return Ok(existing);
        }
        self.socket_mut(socket)?.show_all = true;
        self.invalidate(socket);
        self.reconcile_params(socket)?;
        self.refresh_socket(socket)?;
        self.param_figure(socket, element)
    }

    /// Remove a parameter with its variable link and data links
    pub fn remove_param(&mut self, param: FigureId) -> Result<(), FigureError> {
        let socket = self.parameter(param)?.socket;
        let socket_element = self.socket_element(socket)?;
        let element = self
            .element_of(param)
            .cloned()
            .ok_or_else(|| FigureError::illegal(param, "remove", "not bound to a parameter"))?;

        self.model.remove_parameter(&socket_element, &element)?;
        if self.parameter(param)?.variable_link.is_some() {
            self.remove_variable_link(param)?;
        }
        for connection in self.connections_of(param) {
            self.disconnect(connection)?;
        }

        self.invalidate(socket);
        self.remove_figure(param)?;
        self.socket_mut(socket)?.params.retain(|&p| p != param);
        tracing::debug!(%element, socket = %socket, "removed parameter");
        self.refresh_socket(socket)
    }

    /// Move a parameter from one 0-based position to another.
    ///
    /// The domain list is shifted the same way so both orders stay equal.
    pub fn move_parameter(
        &mut self,
        socket: FigureId,
        old_index: usize,
        new_index: usize,
    ) -> Result<(), FigureError> {
        let socket_element = self.socket_element(socket)?;
        let params = self.socket(socket)?.params.clone();
        for index in [old_index, new_index] {
            if index >= params.len() {
                return Err(FigureError::IndexOutOfRange {
                    index,
                    len: params.len(),
                });
            }
        }
        if old_index == new_index {
            return Ok(());
        }

        let domain = self.model.parameters(&socket_element);
        let domain_index = |figure: FigureId| {
            let element = self.element_of(figure);
            domain
                .iter()
                .position(|p| Some(&p.element) == element)
                .ok_or_else(|| FigureError::illegal(figure, "move", "missing from the domain socket"))
        };
        let from = domain_index(params[old_index])?;
        let to = domain_index(params[new_index])?;
        self.model.move_parameter(&socket_element, from, to)?;

        self.invalidate(socket);
        {
            let figure = self.socket_mut(socket)?;
            let moved = figure.params.remove(old_index);
            figure.params.insert(new_index, moved);
        }
        self.refresh_socket(socket)
    }

    /// Reconcile parameter figures with the domain socket.
    ///
    /// Figures of parameters that are still shown are kept, so their variable
    /// links survive.
    pub fn reinit_params(&mut self, socket: FigureId, show_all: bool) -> Result<(), FigureError> {
        self.invalidate(socket);
        self.socket_mut(socket)?.show_all = show_all;
        self.reconcile_params(socket)?;
        self.refresh_socket(socket)
    }

    /// Rebuild the figure list in domain order, reusing figures by element
    pub(super) fn reconcile_params(&mut self, socket: FigureId) -> Result<(), FigureError> {
        let socket_element = self.socket_element(socket)?;
        let (current, show_all) = {
            let figure = self.socket(socket)?;
            (figure.params.clone(), figure.show_all)
        };
        let mut existing: HashMap<ElementId, FigureId> = current
            .iter()
            .filter_map(|&id| self.element_of(id).map(|e| (e.clone(), id)))
            .collect();

        let mut params = Vec::new();
        for entry in self.model.parameters(&socket_element) {
            if !(entry.visible || show_all) {
                continue;
            }
            let id = match existing.remove(&entry.element) {
                Some(id) => id,
                None => {
                    let attributes = self.stored_attributes(&entry.element);
                    let mut figure = ParameterFigure::new(socket, entry.element.as_str());
                    figure.decode(&attributes);
                    self.insert_figure(
                        Some(entry.element.clone()),
                        FigureKind::Parameter(figure),
                        attributes.passthrough,
                    )?
                }
            };
            params.push(id);
        }

        // Figures whose parameter is gone or hidden; the domain already reflects that
        for stale in current.into_iter().filter(|id| !params.contains(id)) {
            for connection in self.connections_of(stale) {
                self.discard_connection(connection)?;
            }
            if let Some(link) = self.parameter(stale)?.variable_link {
                self.discard_connection(link.connection)?;
            }
            self.remove_figure(stale)?;
        }

        self.socket_mut(socket)?.params = params;
        Ok(())
    }

    /// Lay out a socket and its content around the owning node's current shape
    pub(super) fn layout_socket(&mut self, socket: FigureId) -> Result<(), FigureError> {
        let (node, angle, params, title) = {
            let figure = self.socket(socket)?;
            (
                figure.node,
                figure.angle,
                figure.params.clone(),
                figure.title.clone(),
            )
        };
        let (presentation, shape) = {
            let node = self.node(node)?;
            (node.presentation, node.shape)
        };
        let config = self.config.clone();

        let anchor = boundary_point(shape, &presentation, angle);
        let dir = direction(angle);
        let side = side_of(angle, &presentation);
        let marker = BoundingBox::centered_at(anchor, config.socket_size, config.socket_size);
        let title_width = config.label_width(&title);
        let reach = |i: usize| config.socket_size / 2.0 + (i + 1) as f64 * config.parameter_spacing;

        let (centers, title_bounds): (Vec<Point>, BoundingBox) = match config.display_mode {
            DisplayMode::Radial => (
                (0..params.len())
                    .map(|i| anchor.translated(dir.0 * reach(i), dir.1 * reach(i)))
                    .collect(),
                place_outward(
                    anchor,
                    dir,
                    config.socket_size / 2.0
                        + params.len() as f64 * config.parameter_spacing
                        + config.title_offset,
                    title_width,
                    config.label_height,
                ),
            ),
            DisplayMode::Stacked => {
                let sign = if side == Side::Top { -1.0 } else { 1.0 };
                (
                    (0..params.len())
                        .map(|i| anchor.translated(0.0, sign * reach(i)))
                        .collect(),
                    BoundingBox::new(
                        marker.right() + config.title_offset,
                        anchor.y - config.label_height / 2.0,
                        title_width,
                        config.label_height,
                    ),
                )
            }
        };

        let mut bounds = marker;
        if !title.is_empty() {
            bounds = bounds.union(&title_bounds);
        }
        for (&param, &center) in params.iter().zip(&centers) {
            bounds = bounds.union(&self.layout_param(param, center, dir)?);
        }

        let figure = self.socket_mut(socket)?;
        figure.anchor = anchor;
        figure.marker = marker;
        figure.title_bounds = title_bounds;
        figure.bounds = bounds;
        Ok(())
    }

    /// Re-layout a socket after a structural edit and notify
    fn refresh_socket(&mut self, socket: FigureId) -> Result<(), FigureError> {
        let node = self.socket(socket)?.node;
        self.layout_socket(socket)?;
        self.refresh_node_bounds(node)?;
        self.mark_changed(socket);
        let moved = self.family(socket)?;
        self.propagate(&moved)
    }

    fn socket_element(&self, socket: FigureId) -> Result<ElementId, FigureError> {
        self.socket(socket)?;
        self.element_of(socket)
            .cloned()
            .ok_or_else(|| FigureError::illegal(socket, "edit", "not bound to a domain socket"))
    }

    fn param_figure(&self, socket: FigureId, element: &ElementId) -> Result<FigureId, FigureError> {
        self.figure_for(element)
            .filter(|id| self.socket(socket).map(|s| s.params.contains(id)).unwrap_or(false))
            .ok_or_else(|| FigureError::illegal(socket, "show parameter on", "parameter is hidden"))
    }
}
