//! Error types for state access and realization.

use crate::stage::Stage;
use mb_core::{Id, MbError};
use thiserror::Error;

/// Errors raised by the state container.
///
/// All of these are programming errors: reading something before the stage
/// that produces it, or with the wrong type or index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("{what} requires stage {required} but the state is realized only to {current}")]
    StageTooLow {
        what: &'static str,
        required: Stage,
        current: Stage,
    },

    #[error("Cannot advance from stage {from} to {to}")]
    StageOrder { from: Stage, to: Stage },

    #[error("Unknown {what} {id}")]
    UnknownEntry { what: &'static str, id: Id },

    #[error("Type mismatch reading {what}")]
    TypeMismatch { what: &'static str },

    #[error("Cache entry {what} has not been computed")]
    NotValid { what: &'static str },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Core error: {0}")]
    Core(#[from] MbError),
}

pub type StateResult<T> = Result<T, StateError>;
