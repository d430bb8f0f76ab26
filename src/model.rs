//! Boundary to the process domain model
//!
//! The engine never interprets business semantics. It reads and writes the
//! geometry attribute of model elements, asks the model for socket parameter
//! lists and type compatibility, and asks it to create or remove links.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Identifier of a domain model element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Runtime type of an element and the capabilities it declares, in priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: String,
    pub capabilities: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Vec::new(),
        }
    }

    /// Add a declared capability
    pub fn with_capability(mut self, capability: TypeDescriptor) -> Self {
        self.capabilities.push(capability);
        self
    }
}

/// A parameter of a domain socket, in domain order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterEntry {
    pub element: ElementId,
    /// Hidden parameters only get figures when all parameters are shown
    pub visible: bool,
}

/// Kind of a link between figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Execution order between two sockets
    Control,
    /// Data flow between two parameters
    Data,
    /// Data flow between a parameter and a shared variable
    Variable,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Control => "control",
            LinkKind::Data => "data",
            LinkKind::Variable => "variable",
        }
    }
}

/// Errors reported by a domain model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown element '{0}'")]
    UnknownElement(ElementId),

    #[error("parameter '{parameter}' already belongs to socket '{socket}'")]
    DuplicateParameter {
        socket: ElementId,
        parameter: ElementId,
    },

    #[error("parameter index {index} out of range for socket '{socket}' ({len} parameters)")]
    ParameterIndex {
        socket: ElementId,
        index: usize,
        len: usize,
    },
}

/// Read/write access to the domain model used by the figure engine
pub trait DomainModel {
    /// Persisted geometry attribute of an element
    fn geometry(&self, element: &ElementId) -> Option<String>;

    /// Replace the geometry attribute of an element
    fn set_geometry(&mut self, element: &ElementId, geometry: String);

    /// Runtime type of an element, used for figure type lookup
    fn element_type(&self, element: &ElementId) -> Option<TypeDescriptor>;

    /// Parameters of a socket in domain order
    fn parameters(&self, socket: &ElementId) -> Vec<ParameterEntry>;

    /// Insert a new parameter at `index` of the socket's list
    fn insert_parameter(
        &mut self,
        socket: &ElementId,
        parameter: &ElementId,
        index: usize,
    ) -> Result<(), ModelError>;

    /// Remove a parameter from the socket's list
    fn remove_parameter(&mut self, socket: &ElementId, parameter: &ElementId)
        -> Result<(), ModelError>;

    /// Move a parameter inside the socket's list, shifting the ones between
    fn move_parameter(&mut self, socket: &ElementId, from: usize, to: usize)
        -> Result<(), ModelError>;

    /// Whether data may flow from `source` to `target`
    fn parameters_compatible(&self, source: &ElementId, target: &ElementId) -> bool;

    /// Create a domain link and return its element id
    fn create_link(
        &mut self,
        kind: LinkKind,
        source: &ElementId,
        target: &ElementId,
    ) -> Result<ElementId, ModelError>;

    /// Remove a domain link
    fn remove_link(&mut self, link: &ElementId) -> Result<(), ModelError>;
}

/// A link stored by [`InMemoryModel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub kind: LinkKind,
    pub source: ElementId,
    pub target: ElementId,
}

/// Parameter type accepted by every other type
pub const ANY_TYPE: &str = "any";

/// A self-contained domain model, used by the CLI and in tests
#[derive(Debug, Default)]
pub struct InMemoryModel {
    geometry: HashMap<ElementId, String>,
    types: HashMap<ElementId, TypeDescriptor>,
    parameters: HashMap<ElementId, Vec<ParameterEntry>>,
    parameter_types: HashMap<ElementId, String>,
    links: BTreeMap<ElementId, LinkRecord>,
    next_link: u64,
}

impl InMemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the runtime type of an element
    pub fn set_type(&mut self, element: &ElementId, descriptor: TypeDescriptor) {
        self.types.insert(element.clone(), descriptor);
    }

    /// Append a parameter to a socket, typed by name
    pub fn push_parameter(
        &mut self,
        socket: &ElementId,
        parameter: &ElementId,
        type_name: &str,
        visible: bool,
    ) {
        self.parameters
            .entry(socket.clone())
            .or_default()
            .push(ParameterEntry {
                element: parameter.clone(),
                visible,
            });
        self.parameter_types
            .insert(parameter.clone(), type_name.to_string());
    }

    /// Declare the data type of a parameter
    pub fn set_parameter_type(&mut self, parameter: &ElementId, type_name: &str) {
        self.parameter_types
            .insert(parameter.clone(), type_name.to_string());
    }

    /// Register an existing link under a known id
    pub fn insert_link(&mut self, id: &ElementId, kind: LinkKind, source: &ElementId, target: &ElementId) {
        self.links.insert(
            id.clone(),
            LinkRecord {
                kind,
                source: source.clone(),
                target: target.clone(),
            },
        );
    }

    pub fn link(&self, id: &ElementId) -> Option<&LinkRecord> {
        self.links.get(id)
    }

    pub fn links(&self) -> impl Iterator<Item = (&ElementId, &LinkRecord)> {
        self.links.iter()
    }

    /// All persisted geometry, sorted by element id
    pub fn geometry_entries(&self) -> Vec<(&ElementId, &str)> {
        let mut entries: Vec<_> = self
            .geometry
            .iter()
            .map(|(id, g)| (id, g.as_str()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    fn parameter_list(&mut self, socket: &ElementId) -> &mut Vec<ParameterEntry> {
        self.parameters.entry(socket.clone()).or_default()
    }
}

impl DomainModel for InMemoryModel {
    fn geometry(&self, element: &ElementId) -> Option<String> {
        self.geometry.get(element).cloned()
    }

    fn set_geometry(&mut self, element: &ElementId, geometry: String) {
        self.geometry.insert(element.clone(), geometry);
    }

    fn element_type(&self, element: &ElementId) -> Option<TypeDescriptor> {
        self.types.get(element).cloned()
    }

    fn parameters(&self, socket: &ElementId) -> Vec<ParameterEntry> {
        self.parameters.get(socket).cloned().unwrap_or_default()
    }

    fn insert_parameter(
        &mut self,
        socket: &ElementId,
        parameter: &ElementId,
        index: usize,
    ) -> Result<(), ModelError> {
        let list = self.parameter_list(socket);
        if list.iter().any(|p| &p.element == parameter) {
            return Err(ModelError::DuplicateParameter {
                socket: socket.clone(),
                parameter: parameter.clone(),
            });
        }
        if index > list.len() {
            return Err(ModelError::ParameterIndex {
                socket: socket.clone(),
                index,
                len: list.len(),
            });
        }
        list.insert(
            index,
            ParameterEntry {
                element: parameter.clone(),
                visible: true,
            },
        );
        Ok(())
    }

    fn remove_parameter(
        &mut self,
        socket: &ElementId,
        parameter: &ElementId,
    ) -> Result<(), ModelError> {
        let list = self.parameter_list(socket);
        let before = list.len();
        list.retain(|p| &p.element != parameter);
        if list.len() == before {
            return Err(ModelError::UnknownElement(parameter.clone()));
        }
        Ok(())
    }

    fn move_parameter(
        &mut self,
        socket: &ElementId,
        from: usize,
        to: usize,
    ) -> Result<(), ModelError> {
        let list = self.parameter_list(socket);
        let len = list.len();
        for index in [from, to] {
            if index >= len {
                return Err(ModelError::ParameterIndex {
                    socket: socket.clone(),
                    index,
                    len,
                });
            }
        }
        let entry = list.remove(from);
        list.insert(to, entry);
        Ok(())
    }

    fn parameters_compatible(&self, source: &ElementId, target: &ElementId) -> bool {
        let source_type = self.parameter_types.get(source).map(String::as_str);
        let target_type = self.parameter_types.get(target).map(String::as_str);
        match (source_type, target_type) {
            (None, _) | (_, None) => true,
            (Some(ANY_TYPE), _) | (_, Some(ANY_TYPE)) => true,
            (Some(a), Some(b)) => a == b,
        }
    }

    fn create_link(
        &mut self,
        kind: LinkKind,
        source: &ElementId,
        target: &ElementId,
    ) -> Result<ElementId, ModelError> {
        let id = loop {
            self.next_link += 1;
            let candidate = ElementId::new(format!("{}-link-{}", kind.as_str(), self.next_link));
            if !self.links.contains_key(&candidate) {
                break candidate;
            }
        };
        self.insert_link(&id, kind, source, target);
        Ok(id)
    }

    fn remove_link(&mut self, link: &ElementId) -> Result<(), ModelError> {
        self.links
            .remove(link)
            .map(|_| ())
            .ok_or_else(|| ModelError::UnknownElement(link.clone()))
    }
}
