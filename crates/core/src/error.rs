//! Model error model.

use thiserror::Error;

/// Result type used across the model layer.
pub type ModelResult<T> = Result<T, ModelError>;

/// Model-level error.
///
/// Every failure of a save, lookup or credential check surfaces as one of these
/// kinds. Nothing in the model layer swallows or retries them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The assembled attribute set was rejected by the table schema.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A uniqueness rule was violated (duplicate email, exhausted slug search,
    /// unique column collision reported by storage).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A required fetch matched no row.
    #[error("not found")]
    NotFound,

    /// A credential check failed.
    #[error("authentication failed")]
    Authentication,

    /// Opaque storage collaborator failure.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ModelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Whether the error means the caller's input was unacceptable, as opposed to
    /// a collaborator fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
