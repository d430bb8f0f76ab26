//! Figure type registry: which figure renders which domain element type
//!
//! The registry is an explicit table from a type name to a factory. Lookup
//! tries the element's exact type first, then walks its declared capabilities
//! depth-first in declaration order. It is built once by the session that owns
//! the diagram and passed to [`Diagram::create_figure_for`].

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::error::FigureError;
use crate::figure::{Diagram, FigureId, SocketDirection};
use crate::geometry::ShapeKind;
use crate::model::{DomainModel, ElementId, LinkKind, TypeDescriptor};

/// Errors that can occur during figure type lookup
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Neither the type nor any of its capabilities has a registration
    #[error("no figure registered for element type '{element_type}'")]
    NoRendererRegistered { element_type: String },

    /// The domain model does not know the element's type
    #[error("element '{element}' has no runtime type")]
    UntypedElement { element: ElementId },

    /// The template needs a parent figure that was not supplied
    #[error("a {template} figure needs a parent figure")]
    MissingParent { template: &'static str },
}

/// What a factory decides to build for an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureTemplate {
    Node { shape: ShapeKind },
    Socket { direction: SocketDirection },
    Parameter,
    Connection { kind: LinkKind },
}

impl FigureTemplate {
    fn label(&self) -> &'static str {
        match self {
            FigureTemplate::Node { .. } => "node",
            FigureTemplate::Socket { .. } => "socket",
            FigureTemplate::Parameter => "parameter",
            FigureTemplate::Connection { .. } => "connection",
        }
    }
}

/// Factory producing the template for a resolved element type
pub type FigureFactory = Box<dyn Fn(&TypeDescriptor) -> FigureTemplate + Send + Sync>;

/// Table from element type names to figure factories
#[derive(Default)]
pub struct FigureTypeRegistry {
    factories: HashMap<String, FigureFactory>,
}

impl fmt::Debug for FigureTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FigureTypeRegistry")
            .field("types", &names)
            .finish()
    }
}

impl FigureTypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for an element type; a later registration replaces it
    pub fn register_figure<F>(&mut self, element_type: &str, factory: F)
    where
        F: Fn(&TypeDescriptor) -> FigureTemplate + Send + Sync + 'static,
    {
        if self.factories.contains_key(element_type) {
            tracing::debug!(element_type, "replacing figure registration");
        }
        self.factories
            .insert(element_type.to_string(), Box::new(factory));
    }

    /// Register a fixed template for an element type
    pub fn register_template(&mut self, element_type: &str, template: FigureTemplate) {
        self.register_figure(element_type, move |_| template);
    }

    /// Check if a type has a direct registration
    pub fn contains(&self, element_type: &str) -> bool {
        self.factories.contains_key(element_type)
    }

    /// Resolve the template for an element type
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> Result<FigureTemplate, RegistryError> {
        self.find_factory(descriptor)
            .map(|factory| factory(descriptor))
            .ok_or_else(|| RegistryError::NoRendererRegistered {
                element_type: descriptor.name.clone(),
            })
    }

    fn find_factory(&self, descriptor: &TypeDescriptor) -> Option<&FigureFactory> {
        self.factories.get(&descriptor.name).or_else(|| {
            descriptor
                .capabilities
                .iter()
                .find_map(|capability| self.find_factory(capability))
        })
    }
}

impl<M: DomainModel> Diagram<M> {
    /// Instantiate the figure registered for a domain element.
    ///
    /// Sockets need their node as `parent`, parameters their socket. On any
    /// error no figure is created.
    pub fn create_figure_for(
        &mut self,
        registry: &FigureTypeRegistry,
        element: &ElementId,
        parent: Option<FigureId>,
    ) -> Result<FigureId, FigureError> {
        let descriptor =
            self.model()
                .element_type(element)
                .ok_or_else(|| RegistryError::UntypedElement {
                    element: element.clone(),
                })?;
        let template = registry.resolve(&descriptor)?;
        tracing::debug!(%element, element_type = %descriptor.name, ?template, "creating figure");

        let require_parent = || {
            parent.ok_or(RegistryError::MissingParent {
                template: template.label(),
            })
        };
        match template {
            FigureTemplate::Node { shape } => self.add_node(element, &descriptor.name, shape),
            FigureTemplate::Socket { direction } => self.add_socket(require_parent()?, element, direction),
            FigureTemplate::Parameter => self.attach_param(require_parent()?, element),
            FigureTemplate::Connection { kind } => self.create_connection_for(kind, element),
        }
    }
}
