// ABOUTME: Deployment data model: manifests, clusters, deployments and their diff.
// ABOUTME: Exports the intended-state expansion and the set differ.

mod cluster;
mod config;
mod deployment;
mod deployments;
mod diff;
mod error;
mod manifest;
mod spec;
mod state;

pub use cluster::{Cluster, Clusters};
pub use config::{DeployConfig, Volume, VolumeMode};
pub use deployment::{Annotation, Deployment, TABBED_HEADERS};
pub use deployments::Deployments;
pub use diff::{DeploymentPair, DiffResult, diff};
pub use error::DeployError;
pub use manifest::{Manifest, ManifestDiff, ManifestPair, Manifests};
pub use spec::DeploySpec;
pub use state::State;
