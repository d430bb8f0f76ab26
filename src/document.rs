//! TOML diagram documents
//!
//! A document lists nodes with their sockets and parameters, the links between
//! them and the variable links of parameters. Every element may carry a
//! persisted geometry string. Loading a document fills an [`InMemoryModel`]
//! and builds the matching [`Diagram`].
//!
//! ```toml
//! [placement]
//! publish = "right"
//!
//! [[node]]
//! id = "fetch"
//! type = "activity"
//! title = "Fetch mail"
//! geometry = "origin:100:100|size:64"
//!
//! [[node.socket]]
//! id = "fetch.out"
//! direction = "exit"
//!
//! [[node.socket.parameter]]
//! id = "fetch.out.count"
//! type = "int"
//!
//! [[link]]
//! id = "l1"
//! kind = "control"
//! source = "fetch.out"
//! target = "store.in"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::error::FigureError;
use crate::figure::{Diagram, FigureId, FixedSides, SocketDirection, TransactionControl};
use crate::geometry::Side;
use crate::model::{DomainModel, ElementId, InMemoryModel, LinkKind, TypeDescriptor, ANY_TYPE};
use crate::registry::{FigureTemplate, FigureTypeRegistry};
use crate::skin::Skin;

/// Capability shared by every node type
pub const NODE_TYPE: &str = "node";
pub const ENTRY_SOCKET_TYPE: &str = "entry_socket";
pub const EXIT_SOCKET_TYPE: &str = "exit_socket";
pub const PARAMETER_TYPE: &str = "parameter";

/// Errors that can occur when reading or loading a document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read document: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse document TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A link or variable link names an element the document does not define
    #[error("{context} refers to unknown element '{element}'")]
    UnknownReference { context: String, element: String },

    #[error(transparent)]
    Figure(#[from] FigureError),
}

impl DocumentError {
    fn unknown(context: impl Into<String>, element: &str) -> Self {
        Self::UnknownReference {
            context: context.into(),
            element: element.to_string(),
        }
    }
}

/// A diagram document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Sockets bound to a fixed side of their node
    pub placement: HashMap<String, Side>,
    #[serde(rename = "node")]
    pub nodes: Vec<NodeEntry>,
    #[serde(rename = "link")]
    pub links: Vec<LinkEntry>,
    #[serde(rename = "variable_link")]
    pub variable_links: Vec<VariableLinkEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeEntry {
    pub id: String,
    /// Symbol-type name, resolved against the skin
    #[serde(rename = "type", default = "default_symbol")]
    pub symbol: String,
    pub title: Option<String>,
    pub geometry: Option<String>,
    #[serde(rename = "socket", default)]
    pub sockets: Vec<SocketEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocketEntry {
    pub id: String,
    pub direction: SocketDirection,
    pub title: Option<String>,
    pub geometry: Option<String>,
    /// Show hidden parameters too
    #[serde(default)]
    pub show_all: bool,
    #[serde(rename = "parameter", default)]
    pub parameters: Vec<ParameterEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterEntry {
    pub id: String,
    #[serde(rename = "type", default = "any_type")]
    pub data_type: String,
    #[serde(default = "visible")]
    pub visible: bool,
    pub geometry: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkEntry {
    pub id: String,
    pub kind: LinkKind,
    pub source: String,
    pub target: String,
    pub geometry: Option<String>,
    pub transaction: Option<TransactionControl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableLinkEntry {
    pub id: String,
    pub parameter: String,
    pub variable: String,
    pub geometry: Option<String>,
}

fn default_symbol() -> String {
    "default".to_string()
}

fn any_type() -> String {
    ANY_TYPE.to_string()
}

fn visible() -> bool {
    true
}

impl Document {
    /// Load a document from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a document from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, DocumentError> {
        Ok(toml::from_str(content)?)
    }

    /// Registry mapping the document's element types to figures.
    ///
    /// Node shapes come from the skin entry of each node's symbol type.
    pub fn registry(skin: &Skin) -> FigureTypeRegistry {
        let mut registry = FigureTypeRegistry::new();
        let skin = skin.clone();
        registry.register_figure(NODE_TYPE, move |descriptor| FigureTemplate::Node {
            shape: skin.symbol(&descriptor.name).shape,
        });
        registry.register_template(
            ENTRY_SOCKET_TYPE,
            FigureTemplate::Socket {
                direction: SocketDirection::Entry,
            },
        );
        registry.register_template(
            EXIT_SOCKET_TYPE,
            FigureTemplate::Socket {
                direction: SocketDirection::Exit,
            },
        );
        registry.register_template(PARAMETER_TYPE, FigureTemplate::Parameter);
        registry
    }

    /// Domain model holding every element, link and geometry of the document
    pub fn to_model(&self) -> InMemoryModel {
        let mut model = InMemoryModel::new();

        for node in &self.nodes {
            let node_id = ElementId::new(node.id.as_str());
            model.set_type(
                &node_id,
                TypeDescriptor::new(node.symbol.as_str())
                    .with_capability(TypeDescriptor::new(NODE_TYPE)),
            );
            store_geometry(&mut model, &node_id, &node.geometry);

            for socket in &node.sockets {
                let socket_id = ElementId::new(socket.id.as_str());
                let socket_type = match socket.direction {
                    SocketDirection::Entry => ENTRY_SOCKET_TYPE,
                    SocketDirection::Exit => EXIT_SOCKET_TYPE,
                };
                model.set_type(&socket_id, TypeDescriptor::new(socket_type));
                store_geometry(&mut model, &socket_id, &socket.geometry);

                for param in &socket.parameters {
                    let param_id = ElementId::new(param.id.as_str());
                    model.push_parameter(&socket_id, &param_id, &param.data_type, param.visible);
                    model.set_type(&param_id, TypeDescriptor::new(PARAMETER_TYPE));
                    store_geometry(&mut model, &param_id, &param.geometry);
                }
            }
        }

        for link in &self.links {
            let id = ElementId::new(link.id.as_str());
            model.insert_link(
                &id,
                link.kind,
                &ElementId::new(link.source.as_str()),
                &ElementId::new(link.target.as_str()),
            );
            store_geometry(&mut model, &id, &link.geometry);
        }

        for link in &self.variable_links {
            let id = ElementId::new(link.id.as_str());
            let param = ElementId::new(link.parameter.as_str());
            let variable = ElementId::new(link.variable.as_str());
            // Data flows into entry parameters and out of exit parameters
            match self.parameter_direction(&link.parameter) {
                Some(SocketDirection::Entry) => {
                    model.insert_link(&id, LinkKind::Variable, &variable, &param)
                }
                _ => model.insert_link(&id, LinkKind::Variable, &param, &variable),
            }
            store_geometry(&mut model, &id, &link.geometry);
        }

        model
    }

    /// Build the diagram: figures for every element, arranged sockets and bound links
    pub fn load(&self, skin: &Skin, config: EngineConfig) -> Result<Diagram<InMemoryModel>, DocumentError> {
        let registry = Self::registry(skin);
        let mut diagram = Diagram::with_config(self.to_model(), config);
        let policy = self
            .placement
            .iter()
            .fold(FixedSides::new(), |policy, (socket, &side)| {
                policy.with(socket.as_str(), side)
            });

        for node in &self.nodes {
            let node_id = ElementId::new(node.id.as_str());
            let figure = diagram.create_figure_for(&registry, &node_id, None)?;
            if let Some(title) = &node.title {
                diagram.set_title(figure, Some(title.as_str()))?;
            }
            if let Some(icon) = skin.icon(&node.symbol) {
                diagram.set_icon(figure, Some((icon.name.as_str(), icon.width, icon.height)))?;
            }

            for socket in &node.sockets {
                let socket_id = ElementId::new(socket.id.as_str());
                let socket_figure = diagram.create_figure_for(&registry, &socket_id, Some(figure))?;
                if let Some(title) = &socket.title {
                    diagram.set_socket_title(socket_figure, title)?;
                }
                if socket.show_all {
                    diagram.reinit_params(socket_figure, true)?;
                }
            }

            diagram.layout_unarranged(figure, &policy)?;
        }

        for link in &self.links {
            let context = format!("link '{}'", link.id);
            let start = lookup(&diagram, &context, &link.source)?;
            let end = lookup(&diagram, &context, &link.target)?;
            let connection =
                diagram.load_connection(link.kind, &ElementId::new(link.id.as_str()), start, end)?;
            if link.transaction.is_some() {
                diagram.set_transaction_control(connection, link.transaction)?;
            }
        }

        for link in &self.variable_links {
            let context = format!("variable link '{}'", link.id);
            let param = lookup(&diagram, &context, &link.parameter)?;
            diagram.set_variable_link(
                param,
                &ElementId::new(link.variable.as_str()),
                Some(&ElementId::new(link.id.as_str())),
            )?;
        }

        tracing::debug!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            variable_links = self.variable_links.len(),
            "loaded document"
        );
        Ok(diagram)
    }

    fn parameter_direction(&self, parameter: &str) -> Option<SocketDirection> {
        self.nodes
            .iter()
            .flat_map(|node| &node.sockets)
            .find(|socket| socket.parameters.iter().any(|p| p.id == parameter))
            .map(|socket| socket.direction)
    }
}

fn store_geometry(model: &mut InMemoryModel, id: &ElementId, geometry: &Option<String>) {
    if let Some(geometry) = geometry {
        model.set_geometry(id, geometry.clone());
    }
}

fn lookup(
    diagram: &Diagram<InMemoryModel>,
    context: &str,
    element: &str,
) -> Result<FigureId, DocumentError> {
    diagram
        .figure_for(&ElementId::new(element))
        .ok_or_else(|| DocumentError::unknown(context, element))
}
