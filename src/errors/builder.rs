use thiserror::Error;

/// Errors raised while editing a proposal draft in memory
#[derive(Error, Debug, PartialEq)]
pub enum BuilderError {
    /// Role is not present in `featuresByRole`
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// A module/sub-module/feature/condition index is out of range
    #[error("No {kind} at index {index}")]
    OutOfRange { kind: &'static str, index: usize },

    /// A role with this name already exists
    #[error("Role already exists: {0}")]
    DuplicateRole(String),

    /// Stored content could not be read as a proposal
    #[error("Invalid proposal content: {0}")]
    InvalidContent(String),
}

impl From<serde_json::Error> for BuilderError {
    fn from(err: serde_json::Error) -> Self {
        BuilderError::InvalidContent(err.to_string())
    }
}
