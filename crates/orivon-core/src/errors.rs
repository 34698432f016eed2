use orivon_canonical::ValidationError;
use orivon_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Core error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// The payment signature does not match the order and payment references.
    #[error("payment signature mismatch")]
    InvalidSignature,
    /// The session credential is malformed, expired or names no live user.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    /// A precondition of the operation is not met.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The caller lacks the role the operation requires.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// A collaborator (store, payment processor) could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),
    /// Store failure that is neither an outage nor an absence.
    #[error("store error: {0}")]
    Store(StoreError),
    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => CoreError::Unavailable(reason),
            other => CoreError::Store(other),
        }
    }
}

impl CoreError {
    /// HTTP status an outer layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::NotFound { .. } => 404,
            CoreError::InvalidSignature | CoreError::BadRequest(_) | CoreError::Validation(_) => {
                400
            }
            CoreError::InvalidCredential(_) => 401,
            CoreError::Forbidden(_) => 403,
            CoreError::Unavailable(_) => 503,
            CoreError::Store(_) => 500,
        }
    }

    /// True when the caller, not the system, is at fault.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// A secondary write that failed without failing the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialWriteFailure {
    /// What was being written (`transaction`, `exam_result`, `purchase`...).
    pub target: &'static str,
    /// Rendered cause.
    pub reason: String,
}

impl PartialWriteFailure {
    pub(crate) fn new(target: &'static str, reason: impl ToString) -> Self {
        Self {
            target,
            reason: reason.to_string(),
        }
    }
}
