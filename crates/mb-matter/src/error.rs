//! Error types for kinematic queries.

use mb_core::{BodyId, MbError};
use mb_state::StateError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatterError {
    #[error("Unknown body {body}")]
    UnknownBody { body: BodyId },

    #[error("Unknown particle {index} (system has {len})")]
    UnknownParticle { index: usize, len: usize },

    #[error("Mobility {which} out of range for body {body} with {nu} mobilities")]
    MobilityOob { body: BodyId, which: usize, nu: usize },

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Core error: {0}")]
    Core(#[from] MbError),
}

pub type MatterResult<T> = Result<T, MatterError>;

#[cfg(test)]
mod tests {
    use super::*;
    use mb_state::Stage;

    #[test]
    fn error_display() {
        let err = MatterError::MobilityOob {
            body: BodyId::from_index(2),
            which: 3,
            nu: 1,
        };
        assert!(err.to_string().contains("body 2"));
    }

    #[test]
    fn state_error_converts() {
        let err: MatterError = StateError::StageTooLow {
            what: "body transforms",
            required: Stage::Position,
            current: Stage::Time,
        }
        .into();
        assert!(matches!(err, MatterError::State(StateError::StageTooLow { .. })));
    }
}
