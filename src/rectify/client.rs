// ABOUTME: Interfaces to the cluster scheduler backend and the live-state source.
// ABOUTME: Implemented outside this crate; the engine only consumes them.

use crate::deploy::{Deployment, Deployments};
use crate::types::SourceId;
use async_trait::async_trait;

/// Commands against the scheduler that runs deployments.
#[async_trait]
pub trait RectificationClient: Send + Sync {
    /// Name of the deployable image built for the deployment's source.
    async fn image_name(&self, deployment: &Deployment) -> Result<String, ClientError>;

    /// Start a deployment that does not run yet.
    async fn create(&self, deployment: &Deployment) -> Result<(), ClientError>;

    /// Stop a deployment that should no longer run.
    async fn delete(&self, deployment: &Deployment) -> Result<(), ClientError>;

    /// Move a running deployment from `prior` to `post`.
    async fn modify(&self, prior: &Deployment, post: &Deployment) -> Result<(), ClientError>;
}

/// Source of the actual, currently running deployment set.
#[async_trait]
pub trait ClusterStateSource: Send + Sync {
    /// Query every scheduler in `base_urls` for what it runs.
    async fn running_deployment_set(&self, base_urls: &[String]) -> Result<Deployments, ClientError>;
}

/// Errors reported by scheduler backends.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("no image known for {0}")]
    UnknownImage(SourceId),

    #[error("scheduler rejected request: {0}")]
    Rejected(String),

    #[error("scheduler unavailable: {0}")]
    Unavailable(String),
}
