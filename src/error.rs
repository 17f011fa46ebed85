//! Core error taxonomy.
//!
//! Every failure the core can surface to a caller is a distinct
//! [`CoreError`] variant; none of them are retried or degraded silently.
//! Retry policy for the external embedding/generation primitives lives
//! inside their clients ([`crate::embedding`], [`crate::generate`]), which
//! retry transient HTTP failures before giving up with a single
//! `EmbeddingFailure`/`GenerationFailure`.

use thiserror::Error;

/// Errors surfaced by the ingestion and query paths.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed ingestion payload (blank organization name, blank entry
    /// names in the employee/product/service lists).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Uploaded document could not be parsed or yielded no extractable text.
    #[error("unsupported document: {0}")]
    UnsupportedDocument(String),

    /// Empty or missing question.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The embedding primitive was unreachable, timed out, or returned an
    /// ill-formed vector.
    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    /// The generative-answer primitive was unreachable, timed out, or
    /// returned no usable completion.
    #[error("generation failed: {0}")]
    GenerationFailure(String),

    /// A knowledge index is already registered for this organization id.
    /// Re-ingestion is not a supported operation.
    #[error("organization already indexed: {0}")]
    AlreadyIndexed(String),

    /// No organization with this id exists anywhere.
    #[error("organization not found: {0}")]
    OrganizationNotFound(String),

    /// The organization exists in the metadata store but its index is not
    /// resident (typically: the process restarted since ingestion).
    /// Recoverable only by re-ingestion.
    #[error("index not loaded for organization: {0}")]
    IndexUnavailable(String),

    /// Document store failure (metadata or interaction log).
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A stored organization payload could not be (de)serialized.
    #[error("corrupt organization payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
