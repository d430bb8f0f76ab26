//! Node edits and what they persist

use pretty_assertions::assert_eq;

use process_figures::codec::{decode, encode};
use process_figures::{
    AttributeSet, Diagram, DomainModel, ElementId, FigureId, FlipAxis, GeometryCodec,
    InMemoryModel, LinkKind, Notification, Rgb, RotationDirection, ShapeKind, SocketDirection,
};

fn id(s: &str) -> ElementId {
    ElementId::new(s)
}

fn stored(diagram: &Diagram<InMemoryModel>, element: &str) -> String {
    diagram.model().geometry(&id(element)).unwrap_or_default()
}

/// Node `n` with one exit socket facing east
fn single_socket() -> (Diagram<InMemoryModel>, FigureId, FigureId) {
    let mut model = InMemoryModel::new();
    model.set_geometry(&id("n"), "origin:100:100|size:64|zorder:3".to_string());
    model.set_geometry(&id("n.out"), "angle:0.000000".to_string());
    let mut diagram = Diagram::new(model);
    let node = diagram
        .add_node(&id("n"), "activity", ShapeKind::Rectangle)
        .unwrap();
    let socket = diagram
        .add_socket(node, &id("n.out"), SocketDirection::Exit)
        .unwrap();
    (diagram, node, socket)
}

#[test]
fn test_rotate_turns_sockets_a_quarter() {
    let (mut diagram, node, _) = single_socket();

    diagram.rotate(node, RotationDirection::Clockwise).unwrap();
    assert_eq!(stored(&diagram, "n.out"), "angle:4.712389");

    let (mut diagram, node, _) = single_socket();
    diagram.rotate(node, RotationDirection::CounterClockwise).unwrap();
    assert_eq!(stored(&diagram, "n.out"), "angle:1.570796");
}

#[test]
fn test_flip_mirrors_sockets() {
    let (mut diagram, node, socket) = single_socket();

    diagram.flip(node, FlipAxis::Horizontal).unwrap();

    assert_eq!(stored(&diagram, "n.out"), "angle:3.141593");
    let anchor = diagram.socket(socket).unwrap().anchor;
    assert!((anchor.x - 68.0).abs() < 1e-9);
}

#[test]
fn test_unknown_groups_survive_edits() {
    let (mut diagram, node, _) = single_socket();
    diagram.move_by(node, 10.0, -10.0).unwrap();
    insta::assert_snapshot!(stored(&diagram, "n"), @"origin:110:90|size:64|zorder:3");
}

#[test]
fn test_node_decode_rereads_socket_geometry() {
    let (mut diagram, node, socket) = single_socket();
    diagram
        .model_mut()
        .set_geometry(&id("n.out"), "angle:1.570796".to_string());

    diagram
        .decode_geometry(node, "origin:100:100|size:64")
        .unwrap();

    let figure = diagram.socket(socket).unwrap();
    assert!((figure.angle - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    // Top edge of the 64 wide node centered at (100, 100)
    assert!((figure.anchor.y - 68.0).abs() < 1e-6);
    assert_eq!(stored(&diagram, "n.out"), "angle:1.570796");
}

#[test]
fn test_colorize_reaches_sockets() {
    let (mut diagram, node, socket) = single_socket();

    diagram.colorize(node, Some(Rgb::new(255, 128, 0))).unwrap();
    assert_eq!(
        stored(&diagram, "n"),
        "origin:100:100|size:64|fillcolor:255:128:0|zorder:3"
    );
    assert_eq!(stored(&diagram, "n.out"), "fillcolor:255:128:0|angle:0.000000");
    assert_eq!(diagram.socket(socket).unwrap().fill, Some(Rgb::new(255, 128, 0)));

    diagram.colorize(node, None).unwrap();
    assert_eq!(stored(&diagram, "n.out"), "angle:0.000000");
}

#[test]
fn test_name_angle_moves_title_outward() {
    let (mut diagram, node, _) = single_socket();
    diagram.set_title(node, Some("Ship")).unwrap();
    let below = diagram.node(node).unwrap().title.as_ref().unwrap().bounds;
    assert!(below.y > 132.0);

    diagram.set_name_angle(node, Some(0.0)).unwrap();

    let title = diagram.node(node).unwrap().title.as_ref().unwrap().bounds;
    assert!(title.x >= 132.0);
    assert!((title.center().y - 100.0).abs() < 1e-9);
    assert!(stored(&diagram, "n").contains("nameangle:0.000000"));

    diagram.set_name_angle(node, None).unwrap();
    assert!(!stored(&diagram, "n").contains("nameangle"));
}

#[test]
fn test_move_notifies_node_then_connections() {
    let mut model = InMemoryModel::new();
    model.set_geometry(&id("b"), "origin:300:100|size:64".to_string());
    model.set_geometry(&id("b.in"), "angle:3.141593".to_string());
    model.set_geometry(&id("n"), "origin:100:100|size:64".to_string());
    model.set_geometry(&id("n.out"), "angle:0.000000".to_string());
    let mut diagram = Diagram::new(model);
    let node = diagram
        .add_node(&id("n"), "activity", ShapeKind::Rectangle)
        .unwrap();
    let other = diagram
        .add_node(&id("b"), "activity", ShapeKind::Rectangle)
        .unwrap();
    let out = diagram
        .add_socket(node, &id("n.out"), SocketDirection::Exit)
        .unwrap();
    let input = diagram
        .add_socket(other, &id("b.in"), SocketDirection::Entry)
        .unwrap();
    let link = diagram.connect(LinkKind::Control, out, input).unwrap();
    diagram.take_notifications();

    diagram.move_by(node, 0.0, 20.0).unwrap();

    let notifications = diagram.take_notifications();
    assert_eq!(notifications.first(), Some(&Notification::Invalidated(node)));
    let node_changed = notifications
        .iter()
        .position(|n| *n == Notification::Changed(node))
        .unwrap();
    let link_changed = notifications
        .iter()
        .position(|n| *n == Notification::Changed(link))
        .unwrap();
    assert!(node_changed < link_changed);
    assert!(diagram.take_notifications().is_empty());
}

#[test]
fn test_layout_and_adjust_is_stable() {
    let mut model = InMemoryModel::new();
    model.set_geometry(&id("n"), "origin:100:100|size:64".to_string());
    model.set_geometry(&id("n.out"), "angle:0.000000".to_string());
    model.set_geometry(&id("b"), "origin:300:100|size:64".to_string());
    model.set_geometry(&id("b.in"), "angle:3.141593".to_string());
    let mut diagram = Diagram::new(model);
    let node = diagram
        .add_node(&id("n"), "activity", ShapeKind::Rectangle)
        .unwrap();
    let other = diagram
        .add_node(&id("b"), "activity", ShapeKind::Rectangle)
        .unwrap();
    let out = diagram
        .add_socket(node, &id("n.out"), SocketDirection::Exit)
        .unwrap();
    let input = diagram
        .add_socket(other, &id("b.in"), SocketDirection::Entry)
        .unwrap();
    let link = diagram.connect(LinkKind::Control, out, input).unwrap();
    let straight = diagram.connection(link).unwrap().path.len();

    diagram.layout_and_adjust(link).unwrap();
    assert_eq!(diagram.connection(link).unwrap().path.len(), straight);
}

/// Stores geometry wrapped in brackets, to tell it apart from the default format
struct BracketCodec;

impl GeometryCodec for BracketCodec {
    fn decode(&self, text: &str) -> AttributeSet {
        decode(text.trim_start_matches('[').trim_end_matches(']'))
    }

    fn encode(&self, attributes: &AttributeSet) -> String {
        format!("[{}]", encode(attributes))
    }
}

#[test]
fn test_custom_codec_reads_and_writes() {
    let mut model = InMemoryModel::new();
    model.set_geometry(&id("n"), "[origin:50:50|size:32]".to_string());
    let mut diagram = Diagram::new(model);
    diagram.set_codec(Box::new(BracketCodec));

    let node = diagram
        .add_node(&id("n"), "activity", ShapeKind::Rectangle)
        .unwrap();
    assert_eq!(diagram.node(node).unwrap().presentation.width, 32.0);

    diagram.move_by(node, 5.0, 0.0).unwrap();
    assert_eq!(stored(&diagram, "n"), "[origin:55:50|size:32]");
}

#[test]
fn test_geometry_entries_sorted_by_element() {
    let (diagram, _, _) = single_socket();
    let elements: Vec<_> = diagram
        .model()
        .geometry_entries()
        .into_iter()
        .map(|(element, _)| element.to_string())
        .collect();
    assert_eq!(elements, vec!["n", "n.out"]);
}
