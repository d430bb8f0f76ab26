//! Connection lifecycle, link rules and deletion behavior

use pretty_assertions::assert_eq;

use process_figures::{
    ConnectionState, Diagram, DomainModel, ElementId, FigureError, FigureId, InMemoryModel,
    LinkKind, NoSpecialSockets, Notification, Point, ShapeKind, Side, SocketDirection, TransactionControl,
};

fn id(s: &str) -> ElementId {
    ElementId::new(s)
}

struct Fixture {
    diagram: Diagram<InMemoryModel>,
    x: FigureId,
    out: FigureId,
    input: FigureId,
}

impl Fixture {
    /// Exit socket `x.out` above entry socket `y.in`, with typed parameters on both
    fn new() -> Self {
        let mut model = InMemoryModel::new();
        model.set_geometry(&id("x"), "origin:100:100|size:64".to_string());
        model.set_geometry(&id("y"), "origin:100:300|size:64".to_string());
        model.push_parameter(&id("x.out"), &id("x.count"), "int", true);
        model.push_parameter(&id("x.out"), &id("x.name"), "string", true);
        model.push_parameter(&id("y.in"), &id("y.count"), "int", true);
        model.push_parameter(&id("y.in"), &id("y.value"), "any", true);

        let mut diagram = Diagram::new(model);
        let x = diagram
            .add_node(&id("x"), "activity", ShapeKind::Rectangle)
            .unwrap();
        let y = diagram
            .add_node(&id("y"), "activity", ShapeKind::Rectangle)
            .unwrap();
        let out = diagram
            .add_socket(x, &id("x.out"), SocketDirection::Exit)
            .unwrap();
        let input = diagram
            .add_socket(y, &id("y.in"), SocketDirection::Entry)
            .unwrap();
        diagram.layout_unarranged(x, &NoSpecialSockets).unwrap();
        diagram.layout_unarranged(y, &NoSpecialSockets).unwrap();

        Self {
            diagram,
            x,
            out,
            input,
        }
    }

    fn param(&self, element: &str) -> FigureId {
        self.diagram.figure_for(&id(element)).unwrap()
    }
}

#[test]
fn test_connect_gesture_binds_both_ends() {
    let mut f = Fixture::new();
    let connection = f.diagram.create_connection(LinkKind::Control).unwrap();
    assert_eq!(
        f.diagram.connection(connection).unwrap().state,
        ConnectionState::Unbound
    );

    f.diagram.begin_connect(connection, f.out).unwrap();
    assert_eq!(
        f.diagram.connection(connection).unwrap().state,
        ConnectionState::Connecting
    );

    f.diagram.complete_connect(connection, f.input).unwrap();
    let figure = f.diagram.connection(connection).unwrap();
    assert_eq!(figure.state, ConnectionState::Bound);
    assert_eq!(figure.start, Some(f.out));
    assert_eq!(figure.end, Some(f.input));
    assert!(!figure.path.is_empty());

    // Both endpoints know the connection
    assert_eq!(f.diagram.connections_of(f.out), vec![connection]);
    assert_eq!(f.diagram.connections_of(f.input), vec![connection]);
    assert_eq!(f.diagram.links(), &[connection]);

    let link = f.diagram.element_of(connection).cloned().unwrap();
    let record = f.diagram.model().link(&link).unwrap();
    assert_eq!(record.kind, LinkKind::Control);
    assert_eq!(record.source, id("x.out"));
    assert_eq!(record.target, id("y.in"));
}

#[test]
fn test_refused_end_keeps_gesture_open() {
    let mut f = Fixture::new();
    let connection = f.diagram.create_connection(LinkKind::Control).unwrap();
    f.diagram.begin_connect(connection, f.out).unwrap();

    // Exit to exit is not a control-link
    let result = f.diagram.complete_connect(connection, f.out);
    assert!(matches!(
        result,
        Err(FigureError::IncompatibleConnection { .. })
    ));
    assert_eq!(
        f.diagram.connection(connection).unwrap().state,
        ConnectionState::Connecting
    );
    assert!(f.diagram.connections_of(f.out).is_empty());

    f.diagram.complete_connect(connection, f.input).unwrap();
    assert_eq!(
        f.diagram.connection(connection).unwrap().state,
        ConnectionState::Bound
    );
}

#[test]
fn test_cancel_returns_to_unbound() {
    let mut f = Fixture::new();
    let connection = f.diagram.create_connection(LinkKind::Control).unwrap();
    f.diagram.begin_connect(connection, f.out).unwrap();
    f.diagram.cancel_connect(connection).unwrap();

    let figure = f.diagram.connection(connection).unwrap();
    assert_eq!(figure.state, ConnectionState::Unbound);
    assert_eq!(figure.start, None);
    assert_eq!(f.diagram.model().links().count(), 0);
    assert!(f.diagram.connections_of(f.out).is_empty());
}

#[test]
fn test_refused_connect_invalidates_its_figure() {
    let mut f = Fixture::new();
    let before = f.diagram.figures().count();
    f.diagram.take_notifications();

    let result = f.diagram.connect(LinkKind::Control, f.input, f.out);

    assert!(result.is_err());
    assert_eq!(f.diagram.figures().count(), before);
    let notifications = f.diagram.take_notifications();
    let Some(Notification::Invalidated(dropped)) = notifications.last().cloned() else {
        panic!("expected an invalidation, got {:?}", notifications);
    };
    assert!(!f.diagram.contains(dropped));
}

#[test]
fn test_loading_onto_a_node_leaves_nothing_behind() {
    let mut f = Fixture::new();
    let before = f.diagram.figures().count();

    let result = f
        .diagram
        .load_connection(LinkKind::Control, &id("flow"), f.x, f.input);

    assert!(result.is_err());
    assert_eq!(f.diagram.figures().count(), before);
    assert!(f.diagram.links().is_empty());
    assert!(f.diagram.connections_of(f.input).is_empty());
    assert_eq!(f.diagram.figure_for(&id("flow")), None);
}

#[test]
fn test_loading_between_two_entries_is_refused() {
    let mut f = Fixture::new();
    let second_entry = f
        .diagram
        .add_socket(f.x, &id("x.in"), SocketDirection::Entry)
        .unwrap();
    let before = f.diagram.figures().count();

    let result = f
        .diagram
        .load_connection(LinkKind::Control, &id("flow"), second_entry, f.input);

    assert!(matches!(
        result,
        Err(FigureError::IncompatibleConnection { .. })
    ));
    assert_eq!(f.diagram.figures().count(), before);
    assert!(f.diagram.connections_of(second_entry).is_empty());
    assert_eq!(f.diagram.figure_for(&id("flow")), None);
}

#[test]
fn test_loaded_data_link_needs_no_control_link() {
    let mut f = Fixture::new();
    let (count, target) = (f.param("x.count"), f.param("y.count"));

    let link = f
        .diagram
        .load_connection(LinkKind::Data, &id("count"), count, target)
        .unwrap();

    assert_eq!(
        f.diagram.connection(link).unwrap().state,
        ConnectionState::Bound
    );
    assert_eq!(f.diagram.connections_of(count), vec![link]);
    // Loading the same link again is refused without a second figure
    let before = f.diagram.figures().count();
    let again = f
        .diagram
        .load_connection(LinkKind::Data, &id("count"), count, target);
    assert!(matches!(again, Err(FigureError::DuplicateElement(_))));
    assert_eq!(f.diagram.figures().count(), before);
}

#[test]
fn test_begin_twice_is_illegal() {
    let mut f = Fixture::new();
    let connection = f.diagram.create_connection(LinkKind::Control).unwrap();
    f.diagram.begin_connect(connection, f.out).unwrap();
    let result = f.diagram.begin_connect(connection, f.out);
    assert!(matches!(result, Err(FigureError::IllegalState { .. })));
}

#[test]
fn test_disconnect_unbound_is_illegal() {
    let mut f = Fixture::new();
    let connection = f.diagram.create_connection(LinkKind::Control).unwrap();
    let result = f.diagram.disconnect(connection);
    assert!(matches!(result, Err(FigureError::IllegalState { .. })));
    assert!(f.diagram.contains(connection));
}

#[test]
fn test_disconnect_releases_both_ends_and_domain_link() {
    let mut f = Fixture::new();
    let connection = f
        .diagram
        .connect(LinkKind::Control, f.out, f.input)
        .unwrap();
    let link = f.diagram.element_of(connection).cloned().unwrap();

    let released = f.diagram.disconnect(connection).unwrap();

    assert_eq!(released.state, ConnectionState::Released);
    assert_eq!(released.start, None);
    assert_eq!(released.end, None);
    assert!(!f.diagram.contains(connection));
    assert!(f.diagram.connections_of(f.out).is_empty());
    assert!(f.diagram.connections_of(f.input).is_empty());
    assert!(f.diagram.model().link(&link).is_none());
    assert!(f.diagram.figure_for(&link).is_none());
}

#[test]
fn test_control_link_direction_rules() {
    let f = Fixture::new();
    assert!(f.diagram.can_connect(LinkKind::Control, f.out, f.input));
    assert!(!f.diagram.can_connect(LinkKind::Control, f.input, f.out));
    assert!(!f.diagram.can_connect(LinkKind::Control, f.out, f.out));
    // Nodes are never endpoints
    assert!(!f.diagram.can_connect(LinkKind::Control, f.x, f.input));
}

#[test]
fn test_data_link_needs_control_link_between_sockets() {
    let mut f = Fixture::new();
    let (source, target) = (f.param("x.count"), f.param("y.count"));

    let refused = f.diagram.check_connect(LinkKind::Data, source, target);
    assert!(matches!(
        refused,
        Err(FigureError::IncompatibleConnection { .. })
    ));

    f.diagram
        .connect(LinkKind::Control, f.out, f.input)
        .unwrap();
    assert!(f.diagram.can_connect(LinkKind::Data, source, target));

    let data = f.diagram.connect(LinkKind::Data, source, target).unwrap();
    assert_eq!(f.diagram.connections_of(source), vec![data]);
}

#[test]
fn test_data_link_type_compatibility() {
    let mut f = Fixture::new();
    f.diagram
        .connect(LinkKind::Control, f.out, f.input)
        .unwrap();

    // string into int is refused, anything into "any" is accepted
    assert!(!f
        .diagram
        .can_connect(LinkKind::Data, f.param("x.name"), f.param("y.count")));
    assert!(f
        .diagram
        .can_connect(LinkKind::Data, f.param("x.name"), f.param("y.value")));
    // Data runs from exit parameters to entry parameters only
    assert!(!f
        .diagram
        .can_connect(LinkKind::Data, f.param("y.count"), f.param("x.count")));
}

#[test]
fn test_failed_connect_leaves_nothing_behind() {
    let mut f = Fixture::new();
    let before = f.diagram.figures().count();
    let result = f.diagram.connect(LinkKind::Control, f.input, f.out);
    assert!(result.is_err());
    assert_eq!(f.diagram.figures().count(), before);
    assert!(f.diagram.links().is_empty());
}

#[test]
fn test_delete_control_link_selects_start_socket() {
    let mut f = Fixture::new();
    let connection = f
        .diagram
        .connect(LinkKind::Control, f.out, f.input)
        .unwrap();

    let selection = f.diagram.delete(connection).unwrap();

    assert_eq!(selection, Some(f.out));
    assert!(!f.diagram.contains(connection));
    assert_eq!(f.diagram.model().links().count(), 0);
}

#[test]
fn test_delete_data_link_selects_start_parameter() {
    let mut f = Fixture::new();
    f.diagram
        .connect(LinkKind::Control, f.out, f.input)
        .unwrap();
    let source = f.param("x.count");
    let data = f
        .diagram
        .connect(LinkKind::Data, source, f.param("y.count"))
        .unwrap();

    assert_eq!(f.diagram.delete(data).unwrap(), Some(source));
    assert_eq!(f.diagram.model().links().count(), 1);
}

#[test]
fn test_delete_unbound_connection_touches_no_domain_link() {
    let mut f = Fixture::new();
    let connection = f.diagram.create_connection(LinkKind::Control).unwrap();
    assert_eq!(f.diagram.delete(connection).unwrap(), None);
    assert!(!f.diagram.contains(connection));
}

#[test]
fn test_variable_link_disconnect_clears_parameter() {
    let mut f = Fixture::new();
    let param = f.param("y.count");
    let link = f
        .diagram
        .set_variable_link(param, &id("counter"), None)
        .unwrap();

    // Entry parameters read from the variable
    let connection = f.diagram.connection(link.connection).unwrap();
    assert_eq!(connection.start, Some(link.variable));
    assert_eq!(connection.end, Some(param));
    let element = f.diagram.element_of(link.connection).cloned().unwrap();
    assert_eq!(f.diagram.model().link(&element).unwrap().source, id("counter"));

    let again = f.diagram.set_variable_link(param, &id("other"), None);
    assert!(matches!(
        again,
        Err(FigureError::VariableLinkExists { .. })
    ));

    f.diagram.disconnect(link.connection).unwrap();

    assert_eq!(f.diagram.parameter(param).unwrap().variable_link, None);
    assert!(!f.diagram.contains(link.variable));
    assert!(f.diagram.model().link(&element).is_none());
}

#[test]
fn test_bend_points_persist_on_link() {
    let mut f = Fixture::new();
    let connection = f
        .diagram
        .connect(LinkKind::Control, f.out, f.input)
        .unwrap();
    f.diagram
        .set_bend_points(connection, vec![Point::new(180.0, 200.0)])
        .unwrap();

    let link = f.diagram.element_of(connection).cloned().unwrap();
    let stored = f.diagram.model().geometry(&link).unwrap();
    assert!(stored.starts_with("points:180:200"), "{}", stored);
    assert!(f
        .diagram
        .connection(connection)
        .unwrap()
        .path
        .contains(&Point::new(180.0, 200.0)));
}

#[test]
fn test_flip_locks_opposite_sides() {
    let mut f = Fixture::new();
    let connection = f
        .diagram
        .connect(LinkKind::Control, f.out, f.input)
        .unwrap();
    let (start, end) = {
        let figure = f.diagram.connection(connection).unwrap();
        (figure.start_side().unwrap(), figure.end_side().unwrap())
    };
    assert_eq!((start, end), (Side::Bottom, Side::Top));

    f.diagram.flip_orientation(connection).unwrap();

    let figure = f.diagram.connection(connection).unwrap();
    assert_eq!(figure.start_side(), Some(Side::Top));
    assert_eq!(figure.end_side(), Some(Side::Bottom));
    assert!(figure.is_locked());
    let link = f.diagram.element_of(connection).cloned().unwrap();
    insta::assert_snapshot!(
        f.diagram.model().geometry(&link).unwrap(),
        @"orientation:top:bottom"
    );

    // Unlocking lets automatic resolution take over again
    f.diagram.toggle_orientation_lock(connection).unwrap();
    let figure = f.diagram.connection(connection).unwrap();
    assert!(!figure.is_locked());
    assert_eq!(figure.start_side(), Some(Side::Bottom));
}

#[test]
fn test_transaction_control_only_on_control_links() {
    let mut f = Fixture::new();
    let control = f
        .diagram
        .connect(LinkKind::Control, f.out, f.input)
        .unwrap();
    f.diagram
        .set_transaction_control(control, Some(TransactionControl::Commit))
        .unwrap();
    assert_eq!(
        f.diagram.connection(control).unwrap().transaction,
        Some(TransactionControl::Commit)
    );

    let data = f
        .diagram
        .connect(LinkKind::Data, f.param("x.count"), f.param("y.count"))
        .unwrap();
    let result = f
        .diagram
        .set_transaction_control(data, Some(TransactionControl::Begin));
    assert!(matches!(result, Err(FigureError::IllegalState { .. })));
}

#[test]
fn test_remove_node_cascades_to_connections() {
    let mut f = Fixture::new();
    let control = f
        .diagram
        .connect(LinkKind::Control, f.out, f.input)
        .unwrap();
    let data = f
        .diagram
        .connect(LinkKind::Data, f.param("x.count"), f.param("y.count"))
        .unwrap();

    f.diagram.remove_node(f.x).unwrap();

    assert!(!f.diagram.contains(f.x));
    assert!(!f.diagram.contains(f.out));
    assert!(!f.diagram.contains(control));
    assert!(!f.diagram.contains(data));
    assert!(f.diagram.connections_of(f.input).is_empty());
    assert!(f.diagram.connections_of(f.param("y.count")).is_empty());
    assert_eq!(f.diagram.model().links().count(), 0);
    assert_eq!(f.diagram.nodes().len(), 1);
}
