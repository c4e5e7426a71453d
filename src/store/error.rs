// ABOUTME: Error types for the manifest state server client.
// ABOUTME: Conflicts signal a stale version tag; callers decide whether to retry.

use crate::types::ManifestId;
use hyper::StatusCode;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid state server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A conditional write or delete was refused: the document exists, or
    /// its version tag changed since it was read.
    #[error("conflicting write for manifest {id}: server answered {status}")]
    Conflict { id: ManifestId, status: StatusCode },

    /// The stored document no longer matches what the writer expected.
    #[error("manifest {0} changed since it was read")]
    Stale(ManifestId),

    #[error("manifest {0} not found")]
    NotFound(ManifestId),

    #[error("unexpected status {status} reading manifest {id}")]
    Status { id: ManifestId, status: StatusCode },

    #[error("state server sent no ETag for manifest {0}")]
    MissingEtag(ManifestId),

    #[error("manifest pair changes identity from {prior} to {post}")]
    MismatchedPair { prior: ManifestId, post: ManifestId },

    #[error("state server request timed out after {0:?}")]
    Timeout(Duration),

    #[error("state server transport error: {0}")]
    Transport(String),

    #[error("failed to encode manifest: {0}")]
    Encode(String),

    #[error("failed to decode manifest {id}: {reason}")]
    Decode { id: ManifestId, reason: String },
}

impl StoreError {
    /// True when the caller should re-read and decide whether to retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. } | StoreError::Stale(_))
    }
}
