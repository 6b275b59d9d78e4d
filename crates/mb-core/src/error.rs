use thiserror::Error;

pub type MbResult<T> = Result<T, MbError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MbError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Illegal {what} {value}: must be {rule}")]
    IllegalValue {
        what: &'static str,
        value: f64,
        rule: &'static str,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },
}
