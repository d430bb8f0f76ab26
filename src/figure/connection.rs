//! Connection figures: control-links, data-links and variable-links
//!
//! A connection moves through `Unbound -> Connecting -> Bound -> Released`.
//! Only bound connections are registered as dependents of their endpoints and
//! only they own a domain link.

use std::fmt;

use crate::angle::side_of;
use crate::codec::AttributeSet;
use crate::error::FigureError;
use crate::geometry::{BoundingBox, Point, Side};
use crate::model::{DomainModel, ElementId, LinkKind};
use crate::routing;

use super::socket::SocketDirection;
use super::{Diagram, Figure, FigureId, FigureKind};

/// Lifecycle state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No endpoints assigned
    Unbound,
    /// Start assigned during an interactive drag
    Connecting,
    /// Both endpoints assigned and a domain link exists
    Bound,
    /// Endpoints cleared, removed from the diagram
    Released,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Unbound => "unbound",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Bound => "bound",
            ConnectionState::Released => "released",
        };
        f.write_str(name)
    }
}

/// Transaction-control glyph drawn on a control-link
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionControl {
    Begin,
    Commit,
    Rollback,
}

impl TransactionControl {
    /// Single-letter glyph
    pub fn glyph(&self) -> &'static str {
        match self {
            TransactionControl::Begin => "B",
            TransactionControl::Commit => "C",
            TransactionControl::Rollback => "R",
        }
    }
}

/// Side one end of a connection leaves or enters through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndOrientation {
    /// Side in use; `None` until the connection is first laid out
    pub side: Option<Side>,
    /// Locked sides survive automatic re-layout
    pub locked: bool,
}

/// A curve between two connector figures
#[derive(Debug, Clone)]
pub struct ConnectionFigure {
    pub kind: LinkKind,
    pub state: ConnectionState,
    pub start: Option<FigureId>,
    pub end: Option<FigureId>,
    /// Intermediate control points, in path order
    pub bend_points: Vec<Point>,
    /// Start and end orientation
    pub orientation: [EndOrientation; 2],
    /// Routed polyline from start anchor to end anchor
    pub path: Vec<Point>,
    pub transaction: Option<TransactionControl>,
}

impl ConnectionFigure {
    pub fn new(kind: LinkKind) -> Self {
        Self {
            kind,
            state: ConnectionState::Unbound,
            start: None,
            end: None,
            bend_points: Vec::new(),
            orientation: [EndOrientation::default(); 2],
            path: Vec::new(),
            transaction: None,
        }
    }

    pub fn start_side(&self) -> Option<Side> {
        self.orientation[0].side
    }

    pub fn end_side(&self) -> Option<Side> {
        self.orientation[1].side
    }

    pub fn is_locked(&self) -> bool {
        self.orientation.iter().any(|o| o.locked)
    }
}

impl Figure for ConnectionFigure {
    fn bounds(&self) -> BoundingBox {
        BoundingBox::enclosing(&self.path).unwrap_or_default()
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        for point in self.bend_points.iter_mut().chain(self.path.iter_mut()) {
            *point = point.translated(dx, dy);
        }
    }

    fn encode(&self) -> AttributeSet {
        let locked = |end: &EndOrientation| if end.locked { end.side } else { None };
        AttributeSet {
            points: (!self.bend_points.is_empty()).then(|| {
                self.bend_points
                    .iter()
                    .map(|p| (p.x.round() as i64, p.y.round() as i64))
                    .collect()
            }),
            orientation: self
                .is_locked()
                .then(|| (locked(&self.orientation[0]), locked(&self.orientation[1]))),
            ..AttributeSet::default()
        }
    }

    fn decode(&mut self, attributes: &AttributeSet) {
        if let Some(points) = &attributes.points {
            self.bend_points = points
                .iter()
                .map(|&(x, y)| Point::new(x as f64, y as f64))
                .collect();
        }
        if let Some((start, end)) = attributes.orientation {
            self.orientation = [
                EndOrientation {
                    side: start,
                    locked: start.is_some(),
                },
                EndOrientation {
                    side: end,
                    locked: end.is_some(),
                },
            ];
        }
    }
}

/// Pick the sides two connector ends use from their natural sides and centers.
///
/// Ends on the same axis get complementary sides facing each other. Ends on
/// different axes are resolved independently: a left/right end turns to the
/// bottom when the other end is below it, else the top; a top/bottom end turns
/// right when the other end is to its right, else left.
pub fn resolve_orientation(
    start_side: Side,
    start: Point,
    end_side: Side,
    end: Point,
) -> (Side, Side) {
    match (start_side.is_vertical(), end_side.is_vertical()) {
        (true, true) => {
            if end.y > start.y {
                (Side::Bottom, Side::Top)
            } else {
                (Side::Top, Side::Bottom)
            }
        }
        (false, false) => {
            if end.x > start.x {
                (Side::Right, Side::Left)
            } else {
                (Side::Left, Side::Right)
            }
        }
        _ => (
            independent_side(start_side, start, end),
            independent_side(end_side, end, start),
        ),
    }
}

fn independent_side(natural: Side, own: Point, other: Point) -> Side {
    if natural.is_vertical() {
        if other.x > own.x {
            Side::Right
        } else {
            Side::Left
        }
    } else if other.y > own.y {
        Side::Bottom
    } else {
        Side::Top
    }
}

impl<M: DomainModel> Diagram<M> {
    /// Create an unbound connection figure
    pub fn create_connection(&mut self, kind: LinkKind) -> Result<FigureId, FigureError> {
        self.insert_figure(
            None,
            FigureKind::Connection(ConnectionFigure::new(kind)),
            Vec::new(),
        )
    }

    /// Create an unbound connection for an existing domain link.
    ///
    /// Fails without creating anything if the link already has a figure.
    pub(crate) fn create_connection_for(
        &mut self,
        kind: LinkKind,
        link: &ElementId,
    ) -> Result<FigureId, FigureError> {
        if self.by_element.contains_key(link) {
            return Err(FigureError::DuplicateElement(link.clone()));
        }
        let connection = self.create_connection(kind)?;
        if let Err(err) = self.set_connection_element(connection, link.clone()) {
            self.remove_figure(connection)?;
            return Err(err);
        }
        Ok(connection)
    }

    /// Attach an unbound connection to an existing domain link and restore its geometry
    fn set_connection_element(
        &mut self,
        connection: FigureId,
        element: ElementId,
    ) -> Result<(), FigureError> {
        if self.by_element.contains_key(&element) {
            return Err(FigureError::DuplicateElement(element));
        }
        let attributes = self.stored_attributes(&element);
        self.connection_mut(connection)?.decode(&attributes);
        self.by_element.insert(element.clone(), connection);
        if let Some(figure) = self.figures.get_mut(&connection) {
            figure.element = Some(element);
            figure.passthrough = attributes.passthrough;
        }
        Ok(())
    }

    /// Start an interactive connect gesture at `start`
    pub fn begin_connect(&mut self, connection: FigureId, start: FigureId) -> Result<(), FigureError> {
        self.kind(start)?;
        let figure = self.connection_mut(connection)?;
        if figure.state != ConnectionState::Unbound {
            let state = figure.state.to_string();
            return Err(FigureError::illegal(connection, "begin connecting", state));
        }
        figure.start = Some(start);
        figure.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Whether a link of `kind` may run from `start` to `end`
    pub fn can_connect(&self, kind: LinkKind, start: FigureId, end: FigureId) -> bool {
        self.check_connect(kind, start, end).is_ok()
    }

    /// Like [`Diagram::can_connect`], with the reason for a refusal
    pub fn check_connect(
        &self,
        kind: LinkKind,
        start: FigureId,
        end: FigureId,
    ) -> Result<(), FigureError> {
        self.check_endpoints(kind, start, end)?;
        let (LinkKind::Data, FigureKind::Parameter(from), FigureKind::Parameter(to)) =
            (kind, self.kind(start)?, self.kind(end)?)
        else {
            return Ok(());
        };
        let compatible = match (self.element_of(start), self.element_of(end)) {
            (Some(source), Some(target)) => self.model.parameters_compatible(source, target),
            _ => false,
        };
        if !compatible {
            return Err(FigureError::incompatible("parameter types are not compatible"));
        }
        if !self.has_control_link(from.socket, to.socket) {
            return Err(FigureError::incompatible(
                "data only flows along an existing control-link between the sockets",
            ));
        }
        Ok(())
    }

    /// Endpoint kinds and directions a link of `kind` needs
    fn check_endpoints(
        &self,
        kind: LinkKind,
        start: FigureId,
        end: FigureId,
    ) -> Result<(), FigureError> {
        let start_kind = self.kind(start)?;
        let end_kind = self.kind(end)?;
        if start == end {
            return Err(FigureError::incompatible("a figure cannot connect to itself"));
        }

        match kind {
            LinkKind::Control => {
                let (FigureKind::Socket(from), FigureKind::Socket(to)) = (start_kind, end_kind) else {
                    return Err(FigureError::incompatible("control-links join two sockets"));
                };
                if from.direction != SocketDirection::Exit || to.direction != SocketDirection::Entry {
                    return Err(FigureError::incompatible(
                        "control-links run from an exit socket to an entry socket",
                    ));
                }
                Ok(())
            }
            LinkKind::Data => {
                let (FigureKind::Parameter(from), FigureKind::Parameter(to)) = (start_kind, end_kind)
                else {
                    return Err(FigureError::incompatible("data-links join two parameters"));
                };
                let (from_socket, to_socket) = (from.socket, to.socket);
                if self.socket(from_socket)?.direction != SocketDirection::Exit
                    || self.socket(to_socket)?.direction != SocketDirection::Entry
                {
                    return Err(FigureError::incompatible(
                        "data-links run from an exit parameter to an entry parameter",
                    ));
                }
                Ok(())
            }
            LinkKind::Variable => Err(FigureError::incompatible(
                "variable-links are created through set_variable_link",
            )),
        }
    }

    /// Finish a connect gesture at `end`.
    ///
    /// A refused end leaves the connection in `Connecting`.
    pub fn complete_connect(&mut self, connection: FigureId, end: FigureId) -> Result<(), FigureError> {
        let (kind, start) = {
            let figure = self.connection(connection)?;
            match (figure.state, figure.start) {
                (ConnectionState::Connecting, Some(start)) => (figure.kind, start),
                (state, _) => {
                    return Err(FigureError::illegal(connection, "complete", state.to_string()))
                }
            }
        };
        self.check_connect(kind, start, end)?;
        self.handle_connect(connection, start, end)?;
        self.bind(connection, end)?;
        self.layout_connection(connection)?;
        self.persist(connection)?;
        self.mark_changed(connection);
        tracing::debug!(connection = %connection, start = %start, end = %end, kind = kind.as_str(), "connected");
        Ok(())
    }

    /// Abandon a connect gesture; the connection returns to `Unbound`
    pub fn cancel_connect(&mut self, connection: FigureId) -> Result<(), FigureError> {
        let figure = self.connection_mut(connection)?;
        match figure.state {
            ConnectionState::Connecting | ConnectionState::Unbound => {
                figure.start = None;
                figure.state = ConnectionState::Unbound;
                Ok(())
            }
            state => Err(FigureError::illegal(connection, "cancel", state.to_string())),
        }
    }

    /// Create and bind a connection in one step; nothing remains on failure
    pub fn connect(
        &mut self,
        kind: LinkKind,
        start: FigureId,
        end: FigureId,
    ) -> Result<FigureId, FigureError> {
        let connection = self.create_connection(kind)?;
        let result = self
            .begin_connect(connection, start)
            .and_then(|_| self.complete_connect(connection, end));
        if let Err(err) = result {
            self.remove_figure(connection)?;
            return Err(err);
        }
        Ok(connection)
    }

    /// Bind a connection for a link that already exists in the domain.
    ///
    /// The endpoints must suit `kind`; the control-link a data-link runs
    /// along is not required, since the domain already holds the link.
    pub fn load_connection(
        &mut self,
        kind: LinkKind,
        link: &ElementId,
        start: FigureId,
        end: FigureId,
    ) -> Result<FigureId, FigureError> {
        self.check_endpoints(kind, start, end)?;
        let connection = self.create_connection_for(kind, link)?;
        self.connection_mut(connection)?.start = Some(start);
        self.bind(connection, end)?;
        if let Err(err) = self.layout_connection(connection) {
            self.detach_connection(connection)?;
            return Err(err);
        }
        self.mark_changed(connection);
        Ok(connection)
    }

    /// Release a bound connection, removing its domain link.
    ///
    /// Both endpoints lose the connection and the released figure is handed
    /// back with its endpoints cleared.
    pub fn disconnect(&mut self, connection: FigureId) -> Result<ConnectionFigure, FigureError> {
        let state = self.connection(connection)?.state;
        if state != ConnectionState::Bound {
            return Err(FigureError::illegal(connection, "disconnect", state.to_string()));
        }
        self.handle_disconnect(connection)?;
        let released = self.detach_connection(connection)?;
        tracing::debug!(connection = %connection, kind = released.kind.as_str(), "disconnected");
        Ok(released)
    }

    /// Drop a connection figure without touching the domain
    pub(super) fn discard_connection(
        &mut self,
        connection: FigureId,
    ) -> Result<ConnectionFigure, FigureError> {
        self.detach_connection(connection)
    }

    /// Replace the bend points of a connection
    pub fn set_bend_points(
        &mut self,
        connection: FigureId,
        points: Vec<Point>,
    ) -> Result<(), FigureError> {
        self.invalidate(connection);
        self.connection_mut(connection)?.bend_points = points;
        self.layout_connection(connection)?;
        self.persist(connection)?;
        self.mark_changed(connection);
        Ok(())
    }

    /// Swap both ends to their opposite sides and lock them there
    pub fn flip_orientation(&mut self, connection: FigureId) -> Result<(), FigureError> {
        self.invalidate(connection);
        for end in self.connection_mut(connection)?.orientation.iter_mut() {
            end.side = end.side.map(|side| side.opposite());
            end.locked = end.side.is_some();
        }
        self.layout_connection(connection)?;
        self.persist(connection)?;
        self.mark_changed(connection);
        Ok(())
    }

    /// Lock both ends at their current sides, or unlock them if any is locked
    pub fn toggle_orientation_lock(&mut self, connection: FigureId) -> Result<(), FigureError> {
        self.invalidate(connection);
        let figure = self.connection_mut(connection)?;
        let lock = !figure.is_locked();
        for end in figure.orientation.iter_mut() {
            end.locked = lock && end.side.is_some();
        }
        self.layout_connection(connection)?;
        self.persist(connection)?;
        self.mark_changed(connection);
        Ok(())
    }

    /// Set the transaction glyph of a control-link
    pub fn set_transaction_control(
        &mut self,
        connection: FigureId,
        control: Option<TransactionControl>,
    ) -> Result<(), FigureError> {
        let figure = self.connection_mut(connection)?;
        if figure.kind != LinkKind::Control {
            let kind = figure.kind.as_str();
            return Err(FigureError::illegal(
                connection,
                "set transaction control on",
                format!("a {} link", kind),
            ));
        }
        figure.transaction = control;
        self.mark_changed(connection);
        Ok(())
    }

    /// Resolve end orientations and route the curve
    pub fn layout_and_adjust(&mut self, connection: FigureId) -> Result<(), FigureError> {
        self.invalidate(connection);
        self.layout_connection(connection)?;
        self.mark_changed(connection);
        Ok(())
    }

    pub(super) fn layout_connection(&mut self, connection: FigureId) -> Result<(), FigureError> {
        let figure = self.connection(connection)?;
        let (Some(start), Some(end)) = (figure.start, figure.end) else {
            return Ok(());
        };
        let (orientation, bend_points) = (figure.orientation, figure.bend_points.clone());

        let start_box = self.endpoint_box(start)?;
        let end_box = self.endpoint_box(end)?;
        let (auto_start, auto_end) = resolve_orientation(
            self.natural_side(start)?,
            start_box.center(),
            self.natural_side(end)?,
            end_box.center(),
        );
        let pick = |end: EndOrientation, automatic: Side| match end.side {
            Some(side) if end.locked => side,
            _ => automatic,
        };
        let start_side = pick(orientation[0], auto_start);
        let end_side = pick(orientation[1], auto_end);
        let path = routing::route(
            &start_box,
            start_side,
            &end_box,
            end_side,
            &bend_points,
            self.config.connection_stub,
        );

        let figure = self.connection_mut(connection)?;
        figure.orientation[0].side = Some(start_side);
        figure.orientation[1].side = Some(end_side);
        figure.path = path;
        Ok(())
    }

    /// Create the domain link unless the connection already has one
    fn handle_connect(
        &mut self,
        connection: FigureId,
        start: FigureId,
        end: FigureId,
    ) -> Result<(), FigureError> {
        if self.element_of(connection).is_some() {
            return Ok(());
        }
        let kind = self.connection(connection)?.kind;
        let endpoint = |id: FigureId| {
            self.element_of(id)
                .cloned()
                .ok_or_else(|| FigureError::illegal(id, "connect", "not bound to a domain element"))
        };
        let (source, target) = (endpoint(start)?, endpoint(end)?);
        let link = self.model.create_link(kind, &source, &target)?;
        self.by_element.insert(link.clone(), connection);
        if let Some(figure) = self.figures.get_mut(&connection) {
            figure.element = Some(link);
        }
        Ok(())
    }

    /// Remove the domain link of a connection
    fn handle_disconnect(&mut self, connection: FigureId) -> Result<(), FigureError> {
        if let Some(link) = self.element_of(connection).cloned() {
            self.model.remove_link(&link)?;
        }
        Ok(())
    }

    /// Assign the end, register with both endpoints and enter `Bound`
    pub(super) fn bind(&mut self, connection: FigureId, end: FigureId) -> Result<(), FigureError> {
        let start = {
            let figure = self.connection_mut(connection)?;
            figure.end = Some(end);
            figure.state = ConnectionState::Bound;
            figure.start
        };
        if let Some(start) = start {
            self.add_dependent(start, connection);
        }
        self.add_dependent(end, connection);
        if !self.links.contains(&connection) {
            self.links.push(connection);
        }
        Ok(())
    }

    /// Unregister from both endpoints and take the figure out of the diagram
    fn detach_connection(&mut self, connection: FigureId) -> Result<ConnectionFigure, FigureError> {
        let (kind, start, end) = {
            let figure = self.connection(connection)?;
            (figure.kind, figure.start, figure.end)
        };
        for endpoint in [start, end].into_iter().flatten() {
            self.remove_dependent(endpoint, connection);
        }
        self.links.retain(|&l| l != connection);

        if kind == LinkKind::Variable {
            for endpoint in [start, end].into_iter().flatten() {
                self.clear_variable_link(endpoint, connection)?;
            }
        }

        let removed = self.remove_figure(connection)?;
        let FigureKind::Connection(mut released) = removed.kind else {
            return Err(FigureError::wrong_kind(connection, "connection"));
        };
        released.start = None;
        released.end = None;
        released.path.clear();
        released.state = ConnectionState::Released;
        Ok(released)
    }

    /// Drop the variable-link of `endpoint` if it is backed by `connection`
    fn clear_variable_link(&mut self, endpoint: FigureId, connection: FigureId) -> Result<(), FigureError> {
        let Some(FigureKind::Parameter(param)) = self.figures.get_mut(&endpoint).map(|f| &mut f.kind) else {
            return Ok(());
        };
        if param.variable_link.map(|l| l.connection) != Some(connection) {
            return Ok(());
        }
        let Some(link) = param.variable_link.take() else {
            return Ok(());
        };
        let socket = param.socket;

        self.invalidate(endpoint);
        if self.contains(link.variable) {
            self.remove_figure(link.variable)?;
        }
        // The socket may already be on its way out
        if self.contains(socket) {
            let node = self.socket(socket)?.node;
            self.layout_socket(socket)?;
            self.refresh_node_bounds(node)?;
        }
        self.mark_changed(endpoint);
        Ok(())
    }

    fn has_control_link(&self, from_socket: FigureId, to_socket: FigureId) -> bool {
        self.links.iter().any(|&link| {
            self.connection(link)
                .map(|c| {
                    c.kind == LinkKind::Control
                        && c.state == ConnectionState::Bound
                        && c.start == Some(from_socket)
                        && c.end == Some(to_socket)
                })
                .unwrap_or(false)
        })
    }

    /// Box a connection attaches to on an endpoint figure
    fn endpoint_box(&self, endpoint: FigureId) -> Result<BoundingBox, FigureError> {
        match self.kind(endpoint)? {
            FigureKind::Socket(socket) => Ok(socket.marker),
            FigureKind::Parameter(param) => Ok(param.marker),
            FigureKind::Variable(variable) => Ok(variable.bounds),
            _ => Err(FigureError::wrong_kind(endpoint, "connector")),
        }
    }

    /// Side an endpoint naturally faces on its node
    fn natural_side(&self, endpoint: FigureId) -> Result<Side, FigureError> {
        match self.kind(endpoint)? {
            FigureKind::Socket(socket) => {
                let node = self.node(socket.node)?;
                Ok(side_of(socket.angle, &node.presentation))
            }
            FigureKind::Parameter(param) => self.natural_side(param.socket),
            FigureKind::Variable(variable) => {
                Ok(self.natural_side(variable.parameter)?.opposite())
            }
            _ => Err(FigureError::wrong_kind(endpoint, "connector")),
        }
    }
}
