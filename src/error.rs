//! Error types for figure graph operations

use thiserror::Error;

use crate::figure::FigureId;
use crate::model::{ElementId, ModelError};
use crate::registry::RegistryError;

/// Errors surfaced by structural figure operations.
///
/// Malformed persisted geometry never produces one of these; it is tolerated
/// by the codec. Everything here is reported to the caller.
#[derive(Debug, Error)]
pub enum FigureError {
    /// Reference to a figure that is not in the diagram
    #[error("unknown figure {id}")]
    UnknownFigure { id: FigureId },

    /// A figure of another kind was passed
    #[error("figure {id} is not a {expected}")]
    WrongKind { id: FigureId, expected: &'static str },

    /// Operation on a child through a parent that does not own it
    #[error("figure {child} is not owned by {parent}")]
    NotOwned { child: FigureId, parent: FigureId },

    /// Operation not allowed in the figure's current state
    #[error("cannot {operation} figure {id} while {state}")]
    IllegalState {
        id: FigureId,
        operation: &'static str,
        state: String,
    },

    /// The two endpoints may not be joined by this kind of link
    #[error("incompatible connection: {reason}")]
    IncompatibleConnection { reason: String },

    /// A parameter already has its one variable-link
    #[error("parameter {parameter} already has a variable link")]
    VariableLinkExists { parameter: FigureId },

    /// A position outside the parameter list
    #[error("position {index} out of range for {len} parameters")]
    IndexOutOfRange { index: usize, len: usize },

    /// A figure for this element already exists
    #[error("element '{0}' already has a figure")]
    DuplicateElement(ElementId),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl FigureError {
    pub fn unknown(id: FigureId) -> Self {
        Self::UnknownFigure { id }
    }

    pub fn wrong_kind(id: FigureId, expected: &'static str) -> Self {
        Self::WrongKind { id, expected }
    }

    pub fn not_owned(child: FigureId, parent: FigureId) -> Self {
        Self::NotOwned { child, parent }
    }

    /// Create an illegal state error
    pub fn illegal(id: FigureId, operation: &'static str, state: impl Into<String>) -> Self {
        Self::IllegalState {
            id,
            operation,
            state: state.into(),
        }
    }

    /// Create an incompatible connection error
    pub fn incompatible(reason: impl Into<String>) -> Self {
        Self::IncompatibleConnection {
            reason: reason.into(),
        }
    }
}
