use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid users response: {0}")]
    InvalidEnvelope(String),
    #[error("users response shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid user record: {0}")]
    InvalidUserRecord(String),
}
