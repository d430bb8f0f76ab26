//! Parameter figures and the variable icons they may link to

use crate::codec::AttributeSet;
use crate::error::FigureError;
use crate::geometry::{BoundingBox, Point};
use crate::model::{DomainModel, ElementId, LinkKind};

use super::connection::ConnectionFigure;
use super::socket::SocketDirection;
use super::{Diagram, Figure, FigureId, FigureKind};

/// Gap between a parameter marker and its label when none is persisted
pub const DEFAULT_LABEL_DISTANCE: i64 = 4;

/// The one variable-link a parameter may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLink {
    pub variable: FigureId,
    pub connection: FigureId,
}

/// A named data slot attached to a socket
#[derive(Debug, Clone)]
pub struct ParameterFigure {
    pub socket: FigureId,
    /// Gap between marker and label
    pub distance: i64,
    pub label: String,
    pub marker: BoundingBox,
    pub label_bounds: BoundingBox,
    pub variable_link: Option<VariableLink>,
    bounds: BoundingBox,
}

impl ParameterFigure {
    pub(super) fn new(socket: FigureId, label: &str) -> Self {
        Self {
            socket,
            distance: DEFAULT_LABEL_DISTANCE,
            label: label.to_string(),
            marker: BoundingBox::zero(),
            label_bounds: BoundingBox::zero(),
            variable_link: None,
            bounds: BoundingBox::zero(),
        }
    }
}

impl Figure for ParameterFigure {
    fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.marker = self.marker.translated(dx, dy);
        self.label_bounds = self.label_bounds.translated(dx, dy);
        self.bounds = self.bounds.translated(dx, dy);
    }

    fn encode(&self) -> AttributeSet {
        AttributeSet {
            distance: Some(self.distance),
            ..AttributeSet::default()
        }
    }

    fn decode(&mut self, attributes: &AttributeSet) {
        if let Some(distance) = attributes.distance {
            self.distance = distance;
        }
    }
}

/// Small icon standing for a shared variable next to a parameter
#[derive(Debug, Clone)]
pub struct VariableFigure {
    pub parameter: FigureId,
    /// Domain variable shown by the icon; several parameters may show the same one
    pub variable: ElementId,
    pub bounds: BoundingBox,
}

impl Figure for VariableFigure {
    fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.bounds = self.bounds.translated(dx, dy);
    }

    fn encode(&self) -> AttributeSet {
        AttributeSet::default()
    }

    fn decode(&mut self, _attributes: &AttributeSet) {}
}

impl<M: DomainModel> Diagram<M> {
    /// Link a parameter to a shared variable.
    ///
    /// Creates the variable icon and a bound variable connection. With
    /// `existing_link` the domain link is reused, otherwise one is created.
    /// Data flows from the variable into entry parameters and from exit
    /// parameters into the variable.
    pub fn set_variable_link(
        &mut self,
        param: FigureId,
        variable: &ElementId,
        existing_link: Option<&ElementId>,
    ) -> Result<VariableLink, FigureError> {
        let socket = {
            let figure = self.parameter(param)?;
            if figure.variable_link.is_some() {
                return Err(FigureError::VariableLinkExists { parameter: param });
            }
            figure.socket
        };
        let direction = self.socket(socket)?.direction;
        let param_element = self
            .element_of(param)
            .cloned()
            .ok_or_else(|| FigureError::illegal(param, "link", "not bound to a parameter"))?;
        if let Some(link) = existing_link {
            if self.by_element.contains_key(link) {
                return Err(FigureError::DuplicateElement(link.clone()));
            }
        }

        let link_element = match existing_link {
            Some(link) => link.clone(),
            None => match direction {
                SocketDirection::Entry => {
                    self.model
                        .create_link(LinkKind::Variable, variable, &param_element)?
                }
                SocketDirection::Exit => {
                    self.model
                        .create_link(LinkKind::Variable, &param_element, variable)?
                }
            },
        };

        let variable_figure = self.insert_figure(
            None,
            FigureKind::Variable(VariableFigure {
                parameter: param,
                variable: variable.clone(),
                bounds: BoundingBox::zero(),
            }),
            Vec::new(),
        )?;
        let (start, end) = match direction {
            SocketDirection::Entry => (variable_figure, param),
            SocketDirection::Exit => (param, variable_figure),
        };
        let attributes = self.stored_attributes(&link_element);
        let mut connection = ConnectionFigure::new(LinkKind::Variable);
        connection.decode(&attributes);
        let connection = self.insert_figure(
            Some(link_element.clone()),
            FigureKind::Connection(connection),
            attributes.passthrough,
        )?;
        self.connection_mut(connection)?.start = Some(start);
        self.bind(connection, end)?;

        let link = VariableLink {
            variable: variable_figure,
            connection,
        };
        self.invalidate(param);
        self.parameter_mut(param)?.variable_link = Some(link);
        let node = self.socket(socket)?.node;
        self.layout_socket(socket)?;
        self.refresh_node_bounds(node)?;
        self.layout_connection(connection)?;
        self.persist(connection)?;
        self.mark_changed(param);
        self.mark_changed(connection);
        tracing::debug!(%variable, link = %link_element, parameter = %param, "set variable link");
        Ok(link)
    }

    /// Remove a parameter's variable-link together with its connection
    pub fn remove_variable_link(&mut self, param: FigureId) -> Result<(), FigureError> {
        let link = self.parameter(param)?.variable_link.ok_or_else(|| {
            FigureError::illegal(param, "remove variable link from", "no variable link is set")
        })?;
        self.disconnect(link.connection)?;
        Ok(())
    }

    /// Change the gap between a parameter marker and its label
    pub fn set_label_distance(&mut self, param: FigureId, distance: i64) -> Result<(), FigureError> {
        self.invalidate(param);
        let socket = {
            let figure = self.parameter_mut(param)?;
            figure.distance = distance;
            figure.socket
        };
        let node = self.socket(socket)?.node;
        self.layout_socket(socket)?;
        self.refresh_node_bounds(node)?;
        self.persist(param)?;
        self.mark_changed(param);
        Ok(())
    }

    /// Place a parameter marker at `center` and its variable beside it.
    ///
    /// Returns the extent of the parameter and its variable icon.
    pub(super) fn layout_param(
        &mut self,
        param: FigureId,
        center: Point,
        dir: (f64, f64),
    ) -> Result<BoundingBox, FigureError> {
        let config = self.config.clone();
        let (link, bounds) = {
            let figure = self.parameter_mut(param)?;
            figure.marker = BoundingBox::centered_at(center, config.parameter_size, config.parameter_size);
            figure.label_bounds = BoundingBox::new(
                figure.marker.right() + figure.distance as f64,
                center.y - config.label_height / 2.0,
                config.label_width(&figure.label),
                config.label_height,
            );
            figure.bounds = figure.marker.union(&figure.label_bounds);
            (figure.variable_link, figure.bounds)
        };

        let Some(link) = link else {
            return Ok(bounds);
        };
        // Beside the parameter, perpendicular to the socket direction
        let (px, py) = (dir.1, -dir.0);
        let variable_center =
            center.translated(px * config.variable_offset, py * config.variable_offset);
        let variable_bounds =
            BoundingBox::centered_at(variable_center, config.variable_size, config.variable_size);
        self.variable_mut(link.variable)?.bounds = variable_bounds;
        Ok(bounds.union(&variable_bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ShapeKind;
    use crate::model::InMemoryModel;

    fn id(s: &str) -> ElementId {
        ElementId::new(s)
    }

    fn setup(direction: SocketDirection) -> (Diagram<InMemoryModel>, FigureId) {
        let mut model = InMemoryModel::new();
        model.push_parameter(&id("s"), &id("p"), "int", true);
        let mut diagram = Diagram::new(model);
        let node = diagram
            .add_node(&id("n"), "activity", ShapeKind::Rectangle)
            .unwrap();
        let socket = diagram.add_socket(node, &id("s"), direction).unwrap();
        let param = diagram.socket(socket).unwrap().params[0];
        (diagram, param)
    }

    #[test]
    fn test_variable_link_direction_follows_socket() {
        let (mut diagram, param) = setup(SocketDirection::Entry);
        let link = diagram.set_variable_link(param, &id("total"), None).unwrap();
        let connection = diagram.connection(link.connection).unwrap();
        assert_eq!(connection.start, Some(link.variable));
        assert_eq!(connection.end, Some(param));

        let element = diagram.element_of(link.connection).unwrap().clone();
        let record = diagram.model().link(&element).unwrap();
        assert_eq!(record.source, id("total"));
        assert_eq!(record.target, id("p"));
    }

    #[test]
    fn test_second_variable_link_rejected() {
        let (mut diagram, param) = setup(SocketDirection::Exit);
        diagram.set_variable_link(param, &id("a"), None).unwrap();
        let err = diagram.set_variable_link(param, &id("b"), None).unwrap_err();
        assert!(matches!(err, FigureError::VariableLinkExists { .. }));
        assert_eq!(diagram.model().links().count(), 1);
    }

    #[test]
    fn test_remove_variable_link_clears_everything() {
        let (mut diagram, param) = setup(SocketDirection::Exit);
        let link = diagram.set_variable_link(param, &id("a"), None).unwrap();
        diagram.remove_variable_link(param).unwrap();

        assert!(diagram.parameter(param).unwrap().variable_link.is_none());
        assert!(!diagram.contains(link.variable));
        assert!(!diagram.contains(link.connection));
        assert!(diagram.connections_of(param).is_empty());
        assert_eq!(diagram.model().links().count(), 0);
        assert!(diagram.remove_variable_link(param).is_err());
    }

    #[test]
    fn test_label_distance_round_trips() {
        let (mut diagram, param) = setup(SocketDirection::Exit);
        diagram.set_label_distance(param, 9).unwrap();
        assert_eq!(
            diagram.model().geometry(&id("p")).as_deref(),
            Some("distance:9")
        );
        let figure = diagram.parameter(param).unwrap();
        assert_eq!(figure.label_bounds.x, figure.marker.right() + 9.0);
    }
}
