// ABOUTME: Loaded intended state: manifests plus the cluster lookup table.
// ABOUTME: Expands every manifest into one deployment per configured cluster.

use super::cluster::Clusters;
use super::deployment::Deployment;
use super::deployments::Deployments;
use super::error::DeployError;
use super::manifest::Manifests;

#[derive(Debug, Clone, Default)]
pub struct State {
    pub manifests: Manifests,
    pub clusters: Clusters,
}

impl State {
    pub fn new(manifests: Manifests, clusters: Clusters) -> Self {
        Self {
            manifests,
            clusters,
        }
    }

    /// The intended deployment set.
    pub fn deployments(&self) -> Result<Deployments, DeployError> {
        let deployments = Deployments::new();

        for manifest in self.manifests.iter() {
            for (cluster_name, spec) in &manifest.deployments {
                let cluster =
                    self.clusters
                        .get(cluster_name)
                        .ok_or_else(|| DeployError::UnknownCluster {
                            manifest: manifest.id(),
                            cluster: cluster_name.clone(),
                        })?;

                if !spec.is_valid() {
                    return Err(DeployError::ZeroVersion {
                        manifest: manifest.id(),
                        cluster: cluster_name.clone(),
                    });
                }

                deployments.add(Deployment::from_manifest(manifest, cluster, spec))?;
            }
        }

        Ok(deployments)
    }

    /// Scheduler base URLs of every configured cluster.
    pub fn base_urls(&self) -> Vec<String> {
        self.clusters.base_urls()
    }
}
