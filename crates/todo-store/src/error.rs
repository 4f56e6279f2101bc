use std::fmt;

use todo_types::TypeError;

use crate::traits::BackendKind;

/// Which kind of entity an identifier was expected to resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Todo,
    Project,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The identifier does not resolve in this backend.
    #[error("cannot find {kind} with ID {id}")]
    NotFound { kind: EntityKind, id: String },

    /// A conditional insert targeted an identifier that is already taken.
    #[error("ID {id} is already in use; the request was blocked to prevent an unintentional overwrite")]
    AlreadyInUse { id: String },

    /// The backend does not offer this operation.
    #[error("{operation} is not supported by the {backend} store")]
    Unsupported {
        operation: &'static str,
        backend: BackendKind,
    },

    /// The submitted values were rejected before reaching storage.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Any other driver, network, timeout or constraint failure.
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn backend(err: impl fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
