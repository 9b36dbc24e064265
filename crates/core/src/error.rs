//! Centralized error types for the gatekeep workspace.

use thiserror::Error;

/// Top-level error enum. Variants map to the failure boundaries of an edit
/// session: store reads, registry fetches, mutation input, store writes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatekeepError {
    /// No persisted grant exists for the principal.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected mutation input or a malformed grant document.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Module registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatekeepError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type GatekeepResult<T> = Result<T, GatekeepError>;

/// A string that is not part of the fixed action vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action key {0:?}")]
pub struct UnknownActionKey(pub String);

impl From<UnknownActionKey> for GatekeepError {
    fn from(e: UnknownActionKey) -> Self {
        Self::Validation(e.to_string())
    }
}
