//! Creating figures for domain elements through the type registry

use pretty_assertions::assert_eq;

use process_figures::{
    Diagram, ElementId, FigureError, FigureTemplate, FigureTypeRegistry, InMemoryModel, LinkKind,
    RegistryError, ShapeKind, SocketDirection, TypeDescriptor,
};

fn id(s: &str) -> ElementId {
    ElementId::new(s)
}

fn registry() -> FigureTypeRegistry {
    let mut registry = FigureTypeRegistry::new();
    registry.register_template("Step", FigureTemplate::Node { shape: ShapeKind::RoundedRectangle });
    registry.register_template(
        "Input",
        FigureTemplate::Socket {
            direction: SocketDirection::Entry,
        },
    );
    registry.register_template("Argument", FigureTemplate::Parameter);
    registry.register_template("Flow", FigureTemplate::Connection { kind: LinkKind::Control });
    registry
}

fn model() -> InMemoryModel {
    let mut model = InMemoryModel::new();
    model.set_type(
        &id("task"),
        TypeDescriptor::new("Task").with_capability(TypeDescriptor::new("Step")),
    );
    model.set_type(&id("task.in"), TypeDescriptor::new("Input"));
    model.set_type(&id("task.in.arg"), TypeDescriptor::new("Argument"));
    model.set_type(&id("note"), TypeDescriptor::new("Comment"));
    model.push_parameter(&id("task.in"), &id("task.in.arg"), "any", false);
    model
}

#[test]
fn test_builds_figures_through_capabilities() {
    let registry = registry();
    let mut diagram = Diagram::new(model());

    let node = diagram
        .create_figure_for(&registry, &id("task"), None)
        .unwrap();
    let socket = diagram
        .create_figure_for(&registry, &id("task.in"), Some(node))
        .unwrap();

    let figure = diagram.node(node).unwrap();
    assert_eq!(figure.symbol, "Task");
    assert_eq!(figure.shape, ShapeKind::RoundedRectangle);
    assert_eq!(figure.sockets, vec![socket]);
    // The parameter is hidden until asked for
    assert!(diagram.socket(socket).unwrap().params.is_empty());

    let param = diagram
        .create_figure_for(&registry, &id("task.in.arg"), Some(socket))
        .unwrap();
    assert_eq!(diagram.socket(socket).unwrap().params, vec![param]);
    assert_eq!(diagram.parameter(param).unwrap().socket, socket);
}

#[test]
fn test_untyped_element_creates_nothing() {
    let registry = registry();
    let mut diagram = Diagram::new(model());

    let result = diagram.create_figure_for(&registry, &id("ghost"), None);

    assert!(matches!(
        result,
        Err(FigureError::Registry(RegistryError::UntypedElement { .. }))
    ));
    assert_eq!(diagram.figures().count(), 0);
}

#[test]
fn test_unregistered_type_creates_nothing() {
    let registry = registry();
    let mut diagram = Diagram::new(model());

    let result = diagram.create_figure_for(&registry, &id("note"), None);

    match result {
        Err(FigureError::Registry(RegistryError::NoRendererRegistered { element_type })) => {
            assert_eq!(element_type, "Comment");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(diagram.figures().count(), 0);
}

#[test]
fn test_socket_without_parent_is_refused() {
    let registry = registry();
    let mut diagram = Diagram::new(model());

    let result = diagram.create_figure_for(&registry, &id("task.in"), None);

    assert!(matches!(
        result,
        Err(FigureError::Registry(RegistryError::MissingParent { template: "socket" }))
    ));
    assert_eq!(diagram.figures().count(), 0);
}

#[test]
fn test_connection_template_starts_unbound() {
    let registry = registry();
    let mut model = model();
    model.set_type(&id("flow"), TypeDescriptor::new("Flow"));
    let mut diagram = Diagram::new(model);

    let connection = diagram
        .create_figure_for(&registry, &id("flow"), None)
        .unwrap();

    assert_eq!(diagram.element_of(connection), Some(&id("flow")));
    let figure = diagram.connection(connection).unwrap();
    assert_eq!(figure.kind, LinkKind::Control);
    assert_eq!(figure.start, None);
    assert!(diagram.links().is_empty());
}

#[test]
fn test_second_connection_for_a_link_is_refused() {
    let registry = registry();
    let mut model = model();
    model.set_type(&id("flow"), TypeDescriptor::new("Flow"));
    let mut diagram = Diagram::new(model);

    let first = diagram
        .create_figure_for(&registry, &id("flow"), None)
        .unwrap();
    let result = diagram.create_figure_for(&registry, &id("flow"), None);

    assert!(matches!(result, Err(FigureError::DuplicateElement(_))));
    assert_eq!(diagram.figures().count(), 1);
    assert_eq!(diagram.figure_for(&id("flow")), Some(first));
}
