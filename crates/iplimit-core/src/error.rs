//! Shared error type across iplimit crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Malformed or missing policy fields.
    ValidationFailed,
    /// Referenced policy or binding does not exist.
    NotFound,
    /// Operation blocked by existing bindings.
    Conflict,
    /// Invalid input outside the policy model (config, wire frames).
    BadRequest,
    /// Unsupported wire/config version.
    UnsupportedVersion,
    /// Persistence backend failure.
    StorageError,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::ValidationFailed => "VALIDATION_FAILED",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Conflict => "CONFLICT",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::StorageError => "STORAGE_ERROR",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, IpLimitError>;

/// Unified error type used by core and admin.
#[derive(Debug, Error)]
pub enum IpLimitError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("storage: {0}")]
    Storage(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl IpLimitError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            IpLimitError::Validation(_) => ClientCode::ValidationFailed,
            IpLimitError::NotFound(_) => ClientCode::NotFound,
            IpLimitError::Conflict(_) => ClientCode::Conflict,
            IpLimitError::BadRequest(_) => ClientCode::BadRequest,
            IpLimitError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            IpLimitError::Storage(_) => ClientCode::StorageError,
            IpLimitError::Internal(_) => ClientCode::Internal,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        IpLimitError::Validation(msg.into())
    }
}
