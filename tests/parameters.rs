//! Parameter figures stay in the same order as the domain socket's list

use pretty_assertions::assert_eq;

use process_figures::{
    Diagram, DomainModel, ElementId, FigureError, FigureId, InMemoryModel, ShapeKind,
    SocketDirection,
};

fn id(s: &str) -> ElementId {
    ElementId::new(s)
}

fn setup(params: &[(&str, bool)]) -> (Diagram<InMemoryModel>, FigureId) {
    let mut model = InMemoryModel::new();
    model.set_geometry(&id("n"), "origin:100:100|size:64".to_string());
    for (param, visible) in params {
        model.push_parameter(&id("n.in"), &id(param), "any", *visible);
    }
    let mut diagram = Diagram::new(model);
    let node = diagram
        .add_node(&id("n"), "activity", ShapeKind::Rectangle)
        .unwrap();
    let socket = diagram
        .add_socket(node, &id("n.in"), SocketDirection::Entry)
        .unwrap();
    (diagram, socket)
}

/// Element ids of the socket's parameter figures, in figure order
fn figure_order(diagram: &Diagram<InMemoryModel>, socket: FigureId) -> Vec<String> {
    diagram
        .socket(socket)
        .unwrap()
        .params
        .iter()
        .map(|&p| diagram.element_of(p).unwrap().to_string())
        .collect()
}

fn domain_order(diagram: &Diagram<InMemoryModel>) -> Vec<String> {
    diagram
        .model()
        .parameters(&id("n.in"))
        .into_iter()
        .map(|p| p.element.to_string())
        .collect()
}

#[test]
fn test_figures_follow_domain_order() {
    let (diagram, socket) = setup(&[("a", true), ("b", true), ("c", true)]);
    assert_eq!(figure_order(&diagram, socket), vec!["a", "b", "c"]);
}

#[test]
fn test_add_param_at_position() {
    let (mut diagram, socket) = setup(&[("a", true), ("b", true)]);

    diagram.add_param(socket, &id("first"), Some(1)).unwrap();
    diagram.add_param(socket, &id("last"), None).unwrap();
    diagram.add_param(socket, &id("middle"), Some(3)).unwrap();

    let expected = vec!["first", "a", "middle", "b", "last"];
    assert_eq!(figure_order(&diagram, socket), expected);
    assert_eq!(domain_order(&diagram), expected);
}

#[test]
fn test_add_param_out_of_range() {
    let (mut diagram, socket) = setup(&[("a", true)]);
    let result = diagram.add_param(socket, &id("x"), Some(3));
    assert!(matches!(
        result,
        Err(FigureError::IndexOutOfRange { index: 3, len: 1 })
    ));
    assert_eq!(domain_order(&diagram), vec!["a"]);
}

#[test]
fn test_add_existing_param_is_duplicate() {
    let (mut diagram, socket) = setup(&[("a", true)]);
    let result = diagram.add_param(socket, &id("a"), None);
    assert!(matches!(result, Err(FigureError::DuplicateElement(_))));
}

#[test]
fn test_move_parameter_shifts_both_lists() {
    let (mut diagram, socket) = setup(&[("a", true), ("b", true), ("c", true), ("d", true)]);

    diagram.move_parameter(socket, 0, 2).unwrap();

    let expected = vec!["b", "c", "a", "d"];
    assert_eq!(figure_order(&diagram, socket), expected);
    assert_eq!(domain_order(&diagram), expected);

    let result = diagram.move_parameter(socket, 0, 4);
    assert!(matches!(result, Err(FigureError::IndexOutOfRange { .. })));
}

#[test]
fn test_remove_param_updates_both_lists() {
    let (mut diagram, socket) = setup(&[("a", true), ("b", true)]);
    let a = diagram.figure_for(&id("a")).unwrap();

    diagram.remove_param(a).unwrap();

    assert!(!diagram.contains(a));
    assert_eq!(figure_order(&diagram, socket), vec!["b"]);
    assert_eq!(domain_order(&diagram), vec!["b"]);
}

#[test]
fn test_hidden_parameters_only_with_show_all() {
    let (mut diagram, socket) = setup(&[("a", true), ("hidden", false), ("c", true)]);
    assert_eq!(figure_order(&diagram, socket), vec!["a", "c"]);

    let a = diagram.figure_for(&id("a")).unwrap();
    let link = diagram.set_variable_link(a, &id("v"), None).unwrap();

    diagram.reinit_params(socket, true).unwrap();
    assert_eq!(figure_order(&diagram, socket), vec!["a", "hidden", "c"]);
    // Figures of still-shown parameters survive with their variable link
    assert_eq!(diagram.figure_for(&id("a")), Some(a));
    assert_eq!(diagram.parameter(a).unwrap().variable_link, Some(link));

    diagram.reinit_params(socket, false).unwrap();
    assert_eq!(figure_order(&diagram, socket), vec!["a", "c"]);
    assert!(diagram.figure_for(&id("hidden")).is_none());
}

#[test]
fn test_parameters_stack_outward_from_marker() {
    let (diagram, socket) = setup(&[("a", true), ("b", true)]);
    let figure = diagram.socket(socket).unwrap();
    let first = diagram.parameter(figure.params[0]).unwrap();
    let second = diagram.parameter(figure.params[1]).unwrap();

    // Entry socket on top: later parameters sit further up
    assert!(second.marker.center().y < first.marker.center().y);
    assert!(first.marker.center().y < figure.marker.center().y);
}

#[test]
fn test_label_distance_persists() {
    let (mut diagram, socket) = setup(&[("a", true)]);
    let param = diagram.socket(socket).unwrap().params[0];
    assert_eq!(diagram.parameter(param).unwrap().distance, 4);

    diagram.set_label_distance(param, 10).unwrap();

    insta::assert_snapshot!(
        diagram.model().geometry(&id("a")).unwrap(),
        @"distance:10"
    );
}
