// ABOUTME: Error types for building manifests and deployment collections.
// ABOUTME: Duplicates and dangling cluster references indicate a config or diff bug.

use crate::types::{DeployId, ManifestId};

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A deployment with this id is already in the collection.
    #[error("duplicate deployment: {0}")]
    DuplicateDeployment(DeployId),

    /// A manifest with this id is already in the collection.
    #[error("duplicate manifest: {0}")]
    DuplicateManifest(ManifestId),

    /// A manifest names a cluster that is not configured.
    #[error("manifest {manifest} references unknown cluster '{cluster}'")]
    UnknownCluster { manifest: ManifestId, cluster: String },

    /// A deploy spec carries a zero version.
    #[error("manifest {manifest} has a zero version for cluster '{cluster}'")]
    ZeroVersion { manifest: ManifestId, cluster: String },
}
