// ABOUTME: Pass-level error types with SNAFU pattern.
// ABOUTME: Every variant stops the pass before any cluster is touched.

use crate::deploy::DeployError;
use crate::rectify::{ClientError, UnitFailure};
use crate::types::{DeployId, SourceId};
use snafu::Snafu;
use std::fmt;

/// The image for one intended deployment could not be named.
#[derive(Debug, thiserror::Error)]
#[error("{source_id} ({id}): {cause}")]
pub struct ImageNameFailure {
    pub id: DeployId,
    pub source_id: SourceId,
    #[source]
    pub cause: UnitFailure,
}

/// Image names are unknown for one or more intended source versions.
#[derive(Debug)]
pub struct MissingImageNamesError {
    /// One entry per failed lookup, sorted by deployment id.
    pub causes: Vec<ImageNameFailure>,
}

impl fmt::Display for MissingImageNamesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image names are unknown for source versions")?;
        for cause in &self.causes {
            write!(f, "\n  {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for MissingImageNamesError {}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ResolveError {
    #[snafu(display("failed to load intended state: {source}"))]
    Load { source: crate::error::Error },

    #[snafu(display("failed to expand intended deployments: {source}"))]
    Intended { source: DeployError },

    #[snafu(display("{source}"))]
    Guard { source: MissingImageNamesError },

    #[snafu(display("failed to fetch running deployments: {source}"))]
    Running { source: ClientError },

    #[snafu(display("timed out fetching running deployments"))]
    RunningTimeout,

    #[snafu(display("reconciliation pass cancelled"))]
    Cancelled,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveErrorKind {
    /// The state directory or its documents could not be read.
    Config,
    /// Manifests do not expand into a valid deployment set.
    InvalidState,
    /// Some intended source versions have no known image.
    MissingImages,
    /// The live cluster state could not be fetched.
    LiveState,
    /// The pass was cancelled or ran past its deadline.
    Cancelled,
}

impl ResolveError {
    pub fn kind(&self) -> ResolveErrorKind {
        match self {
            ResolveError::Load { .. } => ResolveErrorKind::Config,
            ResolveError::Intended { .. } => ResolveErrorKind::InvalidState,
            ResolveError::Guard { .. } => ResolveErrorKind::MissingImages,
            ResolveError::Running { .. } | ResolveError::RunningTimeout => {
                ResolveErrorKind::LiveState
            }
            ResolveError::Cancelled => ResolveErrorKind::Cancelled,
        }
    }

    /// Failed image lookups, if this is a guard failure.
    pub fn missing_images(&self) -> Option<&[ImageNameFailure]> {
        match self {
            ResolveError::Guard { source } => Some(&source.causes),
            _ => None,
        }
    }
}

impl From<MissingImageNamesError> for ResolveError {
    fn from(source: MissingImageNamesError) -> Self {
        ResolveError::Guard { source }
    }
}
