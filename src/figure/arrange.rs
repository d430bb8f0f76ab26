//! Initial placement of sockets that have no persisted angle

use std::collections::HashMap;

use crate::angle::{angle_to, find_free_angle};
use crate::error::FigureError;
use crate::geometry::{BoundingBox, Point, Side};
use crate::model::{DomainModel, ElementId};

use super::socket::SocketDirection;
use super::{Diagram, FigureId};

/// Decides which sockets always bind to a fixed side of their node
pub trait PlacementPolicy {
    /// Side a socket must be placed on, or `None` to place it by direction
    fn fixed_side(&self, socket: &ElementId) -> Option<Side>;
}

/// Every socket is placed by its direction
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpecialSockets;

impl PlacementPolicy for NoSpecialSockets {
    fn fixed_side(&self, _socket: &ElementId) -> Option<Side> {
        None
    }
}

/// Fixed sides for a set of named sockets
#[derive(Debug, Clone, Default)]
pub struct FixedSides {
    sides: HashMap<ElementId, Side>,
}

impl FixedSides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a socket to a side
    pub fn with(mut self, socket: impl Into<ElementId>, side: Side) -> Self {
        self.sides.insert(socket.into(), side);
        self
    }
}

impl PlacementPolicy for FixedSides {
    fn fixed_side(&self, socket: &ElementId) -> Option<Side> {
        self.sides.get(socket).copied()
    }
}

/// Bucket order; sockets placed earlier claim their angles first
const SIDES: [Side; 4] = [Side::Top, Side::Bottom, Side::Right, Side::Left];

/// Point `i` of `n` spread evenly along one edge of `bounds`
fn edge_point(bounds: &BoundingBox, side: Side, i: usize, n: usize) -> Point {
    let t = (2 * i + 1) as f64 / (2 * n) as f64;
    match side {
        Side::Top => Point::new(bounds.x + t * bounds.width, bounds.y),
        Side::Bottom => Point::new(bounds.x + t * bounds.width, bounds.bottom()),
        Side::Right => Point::new(bounds.right(), bounds.y + t * bounds.height),
        Side::Left => Point::new(bounds.x, bounds.y + t * bounds.height),
    }
}

impl<M: DomainModel> Diagram<M> {
    /// Give every unarranged socket of a node a starting angle.
    ///
    /// Entry sockets spread along the top edge, exit sockets along the bottom
    /// edge and sockets with a fixed side along that side. Sockets that are
    /// already arranged keep their angle, so a second call changes nothing.
    /// Returns the sockets that were placed.
    pub fn layout_unarranged(
        &mut self,
        node: FigureId,
        policy: &dyn PlacementPolicy,
    ) -> Result<Vec<FigureId>, FigureError> {
        let (presentation, sockets) = {
            let figure = self.node(node)?;
            (figure.presentation, figure.sockets.clone())
        };

        let mut occupied = Vec::new();
        let mut buckets: HashMap<Side, Vec<FigureId>> = HashMap::new();
        for &socket in &sockets {
            let figure = self.socket(socket)?;
            if figure.arranged {
                occupied.push(figure.angle);
                continue;
            }
            let side = self
                .element_of(socket)
                .and_then(|element| policy.fixed_side(element))
                .unwrap_or(match figure.direction {
                    SocketDirection::Entry => Side::Top,
                    SocketDirection::Exit => Side::Bottom,
                });
            buckets.entry(side).or_default().push(socket);
        }
        if buckets.is_empty() {
            return Ok(Vec::new());
        }

        let center = presentation.center();
        let epsilon = self.config.angle_epsilon;
        let mut placed = Vec::new();
        for side in SIDES {
            let Some(bucket) = buckets.remove(&side) else {
                continue;
            };
            let n = bucket.len();
            for (i, socket) in bucket.into_iter().enumerate() {
                let candidate = angle_to(center, edge_point(&presentation, side, i, n));
                let angle = find_free_angle(candidate, &occupied, epsilon);
                occupied.push(angle);

                let figure = self.socket_mut(socket)?;
                figure.angle = angle;
                figure.arranged = true;
                placed.push(socket);
            }
        }

        self.invalidate(node);
        for &socket in &placed {
            self.layout_socket(socket)?;
            self.persist(socket)?;
            self.mark_changed(socket);
        }
        self.refresh_node_bounds(node)?;
        self.mark_changed(node);
        tracing::debug!(figure = %node, placed = placed.len(), "arranged sockets");

        let mut moved = Vec::new();
        for &socket in &placed {
            moved.extend(self.family(socket)?);
        }
        self.propagate(&moved)?;
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::angular_distance;
    use crate::geometry::ShapeKind;
    use crate::model::InMemoryModel;

    fn id(s: &str) -> ElementId {
        ElementId::new(s)
    }

    #[test]
    fn test_edge_points_split_evenly() {
        let bounds = BoundingBox::new(0.0, 0.0, 80.0, 40.0);
        assert_eq!(edge_point(&bounds, Side::Top, 0, 2), Point::new(20.0, 0.0));
        assert_eq!(edge_point(&bounds, Side::Top, 1, 2), Point::new(60.0, 0.0));
        assert_eq!(edge_point(&bounds, Side::Right, 0, 1), Point::new(80.0, 20.0));
    }

    #[test]
    fn test_exit_sockets_go_below() {
        let mut diagram = Diagram::new(InMemoryModel::new());
        let node = diagram
            .add_node(&id("n"), "activity", ShapeKind::Rectangle)
            .unwrap();
        let exit = diagram
            .add_socket(node, &id("out"), SocketDirection::Exit)
            .unwrap();
        diagram.layout_unarranged(node, &NoSpecialSockets).unwrap();
        assert_eq!(diagram.socket_side(exit).unwrap(), Side::Bottom);
    }

    #[test]
    fn test_fixed_side_wins_over_direction() {
        let mut diagram = Diagram::new(InMemoryModel::new());
        let node = diagram
            .add_node(&id("n"), "activity", ShapeKind::Rectangle)
            .unwrap();
        let publish = diagram
            .add_socket(node, &id("publish"), SocketDirection::Exit)
            .unwrap();
        let policy = FixedSides::new().with("publish", Side::Right);
        diagram.layout_unarranged(node, &policy).unwrap();
        assert_eq!(diagram.socket_side(publish).unwrap(), Side::Right);
        assert!(angular_distance(diagram.socket(publish).unwrap().angle, 0.0) < 1e-9);
    }

    #[test]
    fn test_arranged_sockets_are_left_alone() {
        let mut model = InMemoryModel::new();
        model.set_geometry(&id("kept"), "angle:1.000000".to_string());
        let mut diagram = Diagram::new(model);
        let node = diagram
            .add_node(&id("n"), "activity", ShapeKind::Rectangle)
            .unwrap();
        let kept = diagram
            .add_socket(node, &id("kept"), SocketDirection::Entry)
            .unwrap();
        diagram
            .add_socket(node, &id("fresh"), SocketDirection::Entry)
            .unwrap();

        let placed = diagram.layout_unarranged(node, &NoSpecialSockets).unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(diagram.socket(kept).unwrap().angle, 1.0);
        assert!(diagram.layout_unarranged(node, &NoSpecialSockets).unwrap().is_empty());
    }
}
