//! Process Figures - figure and connection geometry for visual process diagrams
//!
//! This library keeps the visual side of a process diagram consistent with its
//! domain model: node figures with sockets on their boundary, ordered parameter
//! figures on each socket, and control, data and variable connections between
//! them. Geometry is persisted on the domain elements as compact text and
//! restored on load.
//!
//! # Example
//!
//! ```rust
//! use process_figures::{
//!     Diagram, DomainModel, ElementId, InMemoryModel, LinkKind, NoSpecialSockets, ShapeKind,
//!     SocketDirection,
//! };
//!
//! let mut model = InMemoryModel::new();
//! model.set_geometry(&ElementId::new("a"), "origin:50:50|size:40".to_string());
//! model.set_geometry(&ElementId::new("b"), "origin:50:200|size:40".to_string());
//! let mut diagram = Diagram::new(model);
//!
//! let a = diagram.add_node(&ElementId::new("a"), "activity", ShapeKind::Rectangle).unwrap();
//! let b = diagram.add_node(&ElementId::new("b"), "activity", ShapeKind::Rectangle).unwrap();
//! let out = diagram.add_socket(a, &ElementId::new("a.out"), SocketDirection::Exit).unwrap();
//! let input = diagram.add_socket(b, &ElementId::new("b.in"), SocketDirection::Entry).unwrap();
//! diagram.layout_unarranged(a, &NoSpecialSockets).unwrap();
//! diagram.layout_unarranged(b, &NoSpecialSockets).unwrap();
//!
//! let link = diagram.connect(LinkKind::Control, out, input).unwrap();
//! assert_eq!(diagram.connections_of(out), vec![link]);
//! ```

pub mod angle;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod figure;
pub mod geometry;
pub mod model;
pub mod registry;
pub mod renderer;
pub mod routing;
pub mod skin;

pub use angle::{FlipAxis, RotationDirection};
pub use codec::{AttributeSet, GeometryCodec, TextCodec};
pub use config::{ConfigError, DisplayMode, EngineConfig};
pub use document::{Document, DocumentError};
pub use error::FigureError;
pub use figure::{
    ConnectionFigure, ConnectionState, Diagram, EndOrientation, Figure, FigureId, FigureKind,
    FixedSides, NoSpecialSockets, Notification, PlacementPolicy, SocketDirection,
    TransactionControl, VariableLink, VisualElement,
};
pub use geometry::{BoundingBox, Point, Rgb, ShapeKind, Side};
pub use model::{DomainModel, ElementId, InMemoryModel, LinkKind, ModelError, TypeDescriptor};
pub use registry::{FigureTemplate, FigureTypeRegistry, RegistryError};
pub use renderer::{render_svg, SvgConfig};
pub use skin::{Skin, SkinError};
