//! Domain-level error taxonomy for Bundlecast.

use bundlecast_state::StorageError;

/// Malformed poll parameters. Raised before any store is touched.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("field given more than once: {field}")]
    DuplicateField { field: String },

    #[error("unsupported platform: {platform}")]
    UnknownPlatform { platform: String },

    #[error("update bits must be a non-negative integer, got {value:?}")]
    InvalidUpdateBits { value: String },

    #[error("malformed query string: {reason}")]
    MalformedQuery { reason: String },
}

/// Push part-set mismatch or unreadable metadata. Raised before any upload.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("missing required part: {part}")]
    MissingPart { part: String },

    #[error("unexpected part: {part}")]
    UnexpectedPart { part: String },

    #[error("part given more than once: {part}")]
    DuplicatePart { part: String },

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

/// Bundlecast domain errors.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("bad payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("commit already published: {0}")]
    DuplicateCommit(String),

    #[error("upstream store error: {0}")]
    Upstream(#[from] StorageError),
}

impl UpdateError {
    /// Machine-readable tag returned to clients.
    pub fn tag(&self) -> &'static str {
        match self {
            UpdateError::Validation(ValidationError::InvalidUpdateBits { .. }) => {
                "UPDATE_BITS_ERROR"
            }
            UpdateError::Validation(_) => "VALIDATOR_ERROR",
            UpdateError::Payload(_) => "BAD_REQUEST",
            UpdateError::DuplicateCommit(_) => "CONFLICT",
            UpdateError::Upstream(_) => "UPSTREAM_ERROR",
        }
    }

    /// Whether the caller sent something wrong (as opposed to a store
    /// failure they should retry).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, UpdateError::Upstream(_))
    }
}

/// Result type for Bundlecast domain operations.
pub type Result<T> = std::result::Result<T, UpdateError>;
