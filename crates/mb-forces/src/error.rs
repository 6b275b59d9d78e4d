//! Error types for force evaluation.

use mb_core::{ForceId, MbError};
use mb_matter::MatterError;
use mb_state::StateError;
use thiserror::Error;

/// Errors that can occur while configuring or evaluating force elements.
#[derive(Error, Debug)]
pub enum ForceError {
    #[error("Degenerate geometry: {what}")]
    DegenerateGeometry { what: &'static str },

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown force element {id}")]
    UnknownElement { id: ForceId },

    #[error("Force element {id} is not a {expected}")]
    WrongElementType { id: ForceId, expected: &'static str },

    #[error("Matter error: {0}")]
    Matter(#[from] MatterError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Core error: {0}")]
    Core(#[from] MbError),

    /// Failure raised by user code inside a custom force.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl ForceError {
    pub fn custom<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ForceError::Custom(Box::new(err))
    }
}

pub type ForceResult<T> = Result<T, ForceError>;
