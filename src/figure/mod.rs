//! The figure graph of a process diagram
//!
//! A [`Diagram`] is an arena of [`VisualElement`]s. Each element carries a
//! [`FigureKind`] (node, socket, parameter, variable or connection) whose
//! geometry is encoded into the backing model element after every change.
//!
//! Ownership runs one way: nodes list their sockets, sockets list their
//! parameters, a parameter may point at its variable. Connections reference
//! their two endpoints; endpoints never reference connections. Instead the
//! diagram keeps a dependency table from each endpoint to the bound
//! connections that must be re-laid out when the endpoint moves.

mod arrange;
mod connection;
mod node;
mod parameter;
mod socket;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::codec::{AttributeSet, GeometryCodec, TextCodec};
use crate::config::EngineConfig;
use crate::error::FigureError;
use crate::geometry::BoundingBox;
use crate::model::{DomainModel, ElementId};

pub use arrange::{FixedSides, NoSpecialSockets, PlacementPolicy};
pub use connection::{ConnectionFigure, ConnectionState, EndOrientation, TransactionControl};
pub use node::{IconPart, NodeFigure, TitlePart};
pub use parameter::{ParameterFigure, VariableFigure, VariableLink};
pub use socket::{SocketDirection, SocketFigure};

/// Handle of a figure inside a [`Diagram`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FigureId(u64);

impl FigureId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FigureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Behavior shared by every kind of figure
pub trait Figure {
    /// Screen extent of the figure
    fn bounds(&self) -> BoundingBox;

    /// Move every point of the figure by a delta
    fn translate(&mut self, dx: f64, dy: f64);

    /// Persisted geometry of the figure
    fn encode(&self) -> AttributeSet;

    /// Apply persisted geometry; absent attributes keep their current value
    fn decode(&mut self, attributes: &AttributeSet);
}

/// Kind-specific part of a visual element
#[derive(Debug, Clone)]
pub enum FigureKind {
    Node(NodeFigure),
    Socket(SocketFigure),
    Parameter(ParameterFigure),
    Variable(VariableFigure),
    Connection(ConnectionFigure),
}

impl FigureKind {
    pub fn name(&self) -> &'static str {
        match self {
            FigureKind::Node(_) => "node",
            FigureKind::Socket(_) => "socket",
            FigureKind::Parameter(_) => "parameter",
            FigureKind::Variable(_) => "variable",
            FigureKind::Connection(_) => "connection",
        }
    }

    fn as_figure(&self) -> &dyn Figure {
        match self {
            FigureKind::Node(f) => f,
            FigureKind::Socket(f) => f,
            FigureKind::Parameter(f) => f,
            FigureKind::Variable(f) => f,
            FigureKind::Connection(f) => f,
        }
    }

    fn as_figure_mut(&mut self) -> &mut dyn Figure {
        match self {
            FigureKind::Node(f) => f,
            FigureKind::Socket(f) => f,
            FigureKind::Parameter(f) => f,
            FigureKind::Variable(f) => f,
            FigureKind::Connection(f) => f,
        }
    }
}

impl Figure for FigureKind {
    fn bounds(&self) -> BoundingBox {
        self.as_figure().bounds()
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.as_figure_mut().translate(dx, dy)
    }

    fn encode(&self) -> AttributeSet {
        self.as_figure().encode()
    }

    fn decode(&mut self, attributes: &AttributeSet) {
        self.as_figure_mut().decode(attributes)
    }
}

/// A figure in the arena
#[derive(Debug, Clone)]
pub struct VisualElement {
    pub id: FigureId,
    /// Backing domain element; `None` for connections not yet bound
    pub element: Option<ElementId>,
    pub kind: FigureKind,
    /// Unrecognized geometry groups, written back unchanged
    pub passthrough: Vec<(String, String)>,
}

/// Redraw notification for the editing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The figure's old extent must be repainted
    Invalidated(FigureId),
    /// The figure reached a new consistent geometry
    Changed(FigureId),
}

/// Arena of figures bound to a domain model
pub struct Diagram<M: DomainModel> {
    model: M,
    config: EngineConfig,
    codec: Box<dyn GeometryCodec>,
    figures: BTreeMap<FigureId, VisualElement>,
    next_id: u64,
    by_element: HashMap<ElementId, FigureId>,
    /// Endpoint figure -> bound connections depending on it
    dependents: HashMap<FigureId, BTreeSet<FigureId>>,
    nodes: Vec<FigureId>,
    links: Vec<FigureId>,
    notifications: Vec<Notification>,
}

impl<M: DomainModel + fmt::Debug> fmt::Debug for Diagram<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagram")
            .field("model", &self.model)
            .field("figures", &self.figures.len())
            .field("nodes", &self.nodes)
            .field("links", &self.links)
            .finish()
    }
}

impl<M: DomainModel> Diagram<M> {
    /// Create an empty diagram with the default configuration
    pub fn new(model: M) -> Self {
        Self::with_config(model, EngineConfig::default())
    }

    pub fn with_config(model: M, config: EngineConfig) -> Self {
        Self {
            model,
            config,
            codec: Box::new(TextCodec::new()),
            figures: BTreeMap::new(),
            next_id: 0,
            by_element: HashMap::new(),
            dependents: HashMap::new(),
            nodes: Vec::new(),
            links: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Replace the geometry codec
    pub fn set_codec(&mut self, codec: Box<dyn GeometryCodec>) {
        self.codec = codec;
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Node figures in creation order
    pub fn nodes(&self) -> &[FigureId] {
        &self.nodes
    }

    /// Bound connections in creation order
    pub fn links(&self) -> &[FigureId] {
        &self.links
    }

    /// Every figure in the arena, ordered by id
    pub fn figures(&self) -> impl Iterator<Item = &VisualElement> {
        self.figures.values()
    }

    pub fn figure(&self, id: FigureId) -> Option<&VisualElement> {
        self.figures.get(&id)
    }

    pub fn contains(&self, id: FigureId) -> bool {
        self.figures.contains_key(&id)
    }

    /// Figure displaying a domain element
    pub fn figure_for(&self, element: &ElementId) -> Option<FigureId> {
        self.by_element.get(element).copied()
    }

    /// Domain element behind a figure
    pub fn element_of(&self, id: FigureId) -> Option<&ElementId> {
        self.figures.get(&id).and_then(|f| f.element.as_ref())
    }

    pub fn bounds(&self, id: FigureId) -> Result<BoundingBox, FigureError> {
        Ok(self.kind(id)?.bounds())
    }

    /// Bound connections attached to an endpoint figure
    pub fn connections_of(&self, id: FigureId) -> Vec<FigureId> {
        self.dependents
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drain pending redraw notifications
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Current geometry of a figure in its persisted text form
    pub fn encode_geometry(&self, id: FigureId) -> Result<String, FigureError> {
        let figure = self.figures.get(&id).ok_or_else(|| FigureError::unknown(id))?;
        Ok(self.codec.encode(&self.attributes_of(figure)))
    }

    /// Apply a geometry string to a figure and re-layout what depends on it
    pub fn decode_geometry(&mut self, id: FigureId, text: &str) -> Result<(), FigureError> {
        let attributes = self.codec.decode(text);
        self.invalidate(id);
        {
            let figure = self
                .figures
                .get_mut(&id)
                .ok_or_else(|| FigureError::unknown(id))?;
            figure.kind.decode(&attributes);
            figure.passthrough = attributes.passthrough.clone();
        }

        let moved = match self.kind(id)? {
            FigureKind::Node(node) => {
                for socket in node.sockets.clone() {
                    self.reload_socket(socket)?;
                }
                self.relayout_node(id)?;
                self.family(id)?
            }
            FigureKind::Socket(socket) => {
                let node = socket.node;
                self.layout_socket(id)?;
                self.refresh_node_bounds(node)?;
                self.family(id)?
            }
            FigureKind::Parameter(param) => {
                let socket = param.socket;
                let node = self.socket(socket)?.node;
                self.layout_socket(socket)?;
                self.refresh_node_bounds(node)?;
                self.family(socket)?
            }
            FigureKind::Variable(_) => vec![id],
            FigureKind::Connection(_) => {
                self.layout_connection(id)?;
                Vec::new()
            }
        };

        self.persist(id)?;
        self.mark_changed(id);
        self.propagate(&moved)
    }

    /// Delete a figure and return what the editor should select next.
    ///
    /// A control-link hands selection to its start socket and a data-link to
    /// its start figure. Deleting anything else selects nothing.
    pub fn delete(&mut self, id: FigureId) -> Result<Option<FigureId>, FigureError> {
        match self.kind(id)? {
            FigureKind::Connection(connection) => {
                // Control-links start at a socket, data-links at a parameter or variable
                let selection = connection.start;
                if connection.state == ConnectionState::Bound {
                    self.disconnect(id)?;
                } else {
                    self.discard_connection(id)?;
                }
                Ok(selection)
            }
            FigureKind::Node(_) => {
                self.remove_node(id)?;
                Ok(None)
            }
            FigureKind::Socket(socket) => {
                let node = socket.node;
                self.remove_socket(node, id)?;
                Ok(None)
            }
            FigureKind::Parameter(_) => {
                self.remove_param(id)?;
                Ok(None)
            }
            FigureKind::Variable(variable) => {
                let parameter = variable.parameter;
                self.remove_variable_link(parameter)?;
                Ok(None)
            }
        }
    }

    pub fn node(&self, id: FigureId) -> Result<&NodeFigure, FigureError> {
        match self.kind(id)? {
            FigureKind::Node(node) => Ok(node),
            _ => Err(FigureError::wrong_kind(id, "node")),
        }
    }

    pub fn socket(&self, id: FigureId) -> Result<&SocketFigure, FigureError> {
        match self.kind(id)? {
            FigureKind::Socket(socket) => Ok(socket),
            _ => Err(FigureError::wrong_kind(id, "socket")),
        }
    }

    pub fn parameter(&self, id: FigureId) -> Result<&ParameterFigure, FigureError> {
        match self.kind(id)? {
            FigureKind::Parameter(param) => Ok(param),
            _ => Err(FigureError::wrong_kind(id, "parameter")),
        }
    }

    pub fn variable(&self, id: FigureId) -> Result<&VariableFigure, FigureError> {
        match self.kind(id)? {
            FigureKind::Variable(variable) => Ok(variable),
            _ => Err(FigureError::wrong_kind(id, "variable")),
        }
    }

    pub fn connection(&self, id: FigureId) -> Result<&ConnectionFigure, FigureError> {
        match self.kind(id)? {
            FigureKind::Connection(connection) => Ok(connection),
            _ => Err(FigureError::wrong_kind(id, "connection")),
        }
    }

    fn kind(&self, id: FigureId) -> Result<&FigureKind, FigureError> {
        self.figures
            .get(&id)
            .map(|f| &f.kind)
            .ok_or_else(|| FigureError::unknown(id))
    }

    fn kind_mut(&mut self, id: FigureId) -> Result<&mut FigureKind, FigureError> {
        self.figures
            .get_mut(&id)
            .map(|f| &mut f.kind)
            .ok_or_else(|| FigureError::unknown(id))
    }

    fn node_mut(&mut self, id: FigureId) -> Result<&mut NodeFigure, FigureError> {
        match self.kind_mut(id)? {
            FigureKind::Node(node) => Ok(node),
            _ => Err(FigureError::wrong_kind(id, "node")),
        }
    }

    fn socket_mut(&mut self, id: FigureId) -> Result<&mut SocketFigure, FigureError> {
        match self.kind_mut(id)? {
            FigureKind::Socket(socket) => Ok(socket),
            _ => Err(FigureError::wrong_kind(id, "socket")),
        }
    }

    fn parameter_mut(&mut self, id: FigureId) -> Result<&mut ParameterFigure, FigureError> {
        match self.kind_mut(id)? {
            FigureKind::Parameter(param) => Ok(param),
            _ => Err(FigureError::wrong_kind(id, "parameter")),
        }
    }

    fn variable_mut(&mut self, id: FigureId) -> Result<&mut VariableFigure, FigureError> {
        match self.kind_mut(id)? {
            FigureKind::Variable(variable) => Ok(variable),
            _ => Err(FigureError::wrong_kind(id, "variable")),
        }
    }

    fn connection_mut(&mut self, id: FigureId) -> Result<&mut ConnectionFigure, FigureError> {
        match self.kind_mut(id)? {
            FigureKind::Connection(connection) => Ok(connection),
            _ => Err(FigureError::wrong_kind(id, "connection")),
        }
    }

    /// Put a new figure in the arena
    fn insert_figure(
        &mut self,
        element: Option<ElementId>,
        kind: FigureKind,
        passthrough: Vec<(String, String)>,
    ) -> Result<FigureId, FigureError> {
        if let Some(element) = &element {
            if self.by_element.contains_key(element) {
                return Err(FigureError::DuplicateElement(element.clone()));
            }
        }
        self.next_id += 1;
        let id = FigureId(self.next_id);
        if let Some(element) = &element {
            self.by_element.insert(element.clone(), id);
        }
        self.figures.insert(
            id,
            VisualElement {
                id,
                element,
                kind,
                passthrough,
            },
        );
        Ok(id)
    }

    /// Take a figure out of the arena
    fn remove_figure(&mut self, id: FigureId) -> Result<VisualElement, FigureError> {
        let figure = self
            .figures
            .remove(&id)
            .ok_or_else(|| FigureError::unknown(id))?;
        if let Some(element) = &figure.element {
            if self.by_element.get(element) == Some(&id) {
                self.by_element.remove(element);
            }
        }
        self.dependents.remove(&id);
        self.notifications.push(Notification::Invalidated(id));
        Ok(figure)
    }

    /// Re-read the persisted geometry of a socket and its parameters
    fn reload_socket(&mut self, socket: FigureId) -> Result<(), FigureError> {
        let params = self.socket(socket)?.params.clone();
        for id in std::iter::once(socket).chain(params) {
            let Some(element) = self.element_of(id).cloned() else {
                continue;
            };
            let attributes = self.stored_attributes(&element);
            if let Some(figure) = self.figures.get_mut(&id) {
                figure.kind.decode(&attributes);
                figure.passthrough = attributes.passthrough;
            }
        }
        Ok(())
    }

    /// Persisted geometry of an element, decoded
    fn stored_attributes(&self, element: &ElementId) -> AttributeSet {
        self.model
            .geometry(element)
            .map(|text| self.codec.decode(&text))
            .unwrap_or_default()
    }

    fn attributes_of(&self, figure: &VisualElement) -> AttributeSet {
        let mut attributes = figure.kind.encode();
        attributes.passthrough = figure.passthrough.clone();
        attributes
    }

    /// Write a figure's geometry back to its domain element
    fn persist(&mut self, id: FigureId) -> Result<(), FigureError> {
        let figure = self.figures.get(&id).ok_or_else(|| FigureError::unknown(id))?;
        let Some(element) = figure.element.clone() else {
            return Ok(());
        };
        let text = self.codec.encode(&self.attributes_of(figure));
        self.model.set_geometry(&element, text);
        Ok(())
    }

    fn invalidate(&mut self, id: FigureId) {
        self.notifications.push(Notification::Invalidated(id));
    }

    fn mark_changed(&mut self, id: FigureId) {
        self.notifications.push(Notification::Changed(id));
    }

    /// A figure and every figure it carries along when it moves
    fn family(&self, id: FigureId) -> Result<Vec<FigureId>, FigureError> {
        let mut members = vec![id];
        match self.kind(id)? {
            FigureKind::Node(node) => {
                for &socket in &node.sockets {
                    members.extend(self.family(socket)?);
                }
            }
            FigureKind::Socket(socket) => {
                for &param in &socket.params {
                    members.extend(self.family(param)?);
                }
            }
            FigureKind::Parameter(param) => {
                if let Some(link) = &param.variable_link {
                    members.push(link.variable);
                }
            }
            FigureKind::Variable(_) | FigureKind::Connection(_) => {}
        }
        Ok(members)
    }

    fn add_dependent(&mut self, endpoint: FigureId, connection: FigureId) {
        self.dependents
            .entry(endpoint)
            .or_default()
            .insert(connection);
    }

    fn remove_dependent(&mut self, endpoint: FigureId, connection: FigureId) {
        if let Some(set) = self.dependents.get_mut(&endpoint) {
            set.remove(&connection);
            if set.is_empty() {
                self.dependents.remove(&endpoint);
            }
        }
    }

    /// Re-layout every connection depending on the moved figures.
    ///
    /// Runs after the moved figures are consistent, so each connection sees
    /// final endpoint geometry.
    fn propagate(&mut self, moved: &[FigureId]) -> Result<(), FigureError> {
        let affected: BTreeSet<FigureId> = moved
            .iter()
            .filter_map(|id| self.dependents.get(id))
            .flatten()
            .copied()
            .collect();
        for connection in affected {
            self.invalidate(connection);
            self.layout_connection(connection)?;
            self.mark_changed(connection);
        }
        Ok(())
    }
}
