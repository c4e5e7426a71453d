// ABOUTME: A fully resolved deployment: one version of one source in one cluster.
// ABOUTME: Equality covers identity fields only; annotations are observational.

use super::cluster::Cluster;
use super::config::DeployConfig;
use super::manifest::Manifest;
use super::spec::DeploySpec;
use crate::types::{DeployId, ManifestId, ManifestKind, OwnerSet, SourceId};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Header row matching [`Deployment::tabbed`].
pub const TABBED_HEADERS: &str =
    "Cluster\tRepo\tVersion\tOffset\tNumInstances\tOwner\tResources\tEnv";

/// Notes captured from the scheduler that runs a deployment.
///
/// Only populated on deployments observed in a live cluster, never on
/// intended ones. Never takes part in equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// The scheduler's own request identifier for this deployment.
    pub request_id: Option<String>,
    /// When the deployment was observed.
    pub observed_at: Option<DateTime<Utc>>,
}

impl Annotation {
    pub fn observed(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            observed_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Deployment {
    pub config: DeployConfig,
    pub cluster_name: String,
    /// Resolved cluster, when one is known.
    pub cluster: Option<Arc<Cluster>>,
    pub source_id: SourceId,
    pub flavor: String,
    pub owners: OwnerSet,
    pub kind: ManifestKind,
    pub annotation: Annotation,
}

impl Deployment {
    /// Combine a manifest, one of its per-cluster specs and the cluster it
    /// targets. Cluster env defaults are applied under the spec's own env.
    pub fn from_manifest(manifest: &Manifest, cluster: &Arc<Cluster>, spec: &DeploySpec) -> Self {
        Deployment {
            config: spec.config.clone().with_env_defaults(&cluster.env),
            cluster_name: cluster.name.clone(),
            cluster: Some(Arc::clone(cluster)),
            source_id: SourceId::new(manifest.source.clone(), spec.version.clone()),
            flavor: manifest.flavor.clone(),
            owners: manifest.owners.clone(),
            kind: manifest.kind,
            annotation: Annotation::default(),
        }
    }

    pub fn id(&self) -> DeployId {
        DeployId::new(self.manifest_id(), self.cluster_name.clone())
    }

    pub fn manifest_id(&self) -> ManifestId {
        ManifestId::new(self.source_id.location.clone(), self.flavor.clone())
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = annotation;
        self
    }

    /// Fields that make up a deployment's identity and configuration.
    fn identity(&self) -> (&str, &SourceId, &str, ManifestKind, &OwnerSet, &DeployConfig) {
        (
            &self.cluster_name,
            &self.source_id,
            &self.flavor,
            self.kind,
            &self.owners,
            &self.config,
        )
    }

    /// Tab-delimited row for operator output.
    pub fn tabbed(&self) -> String {
        let owner = self.owners.iter().next().unwrap_or("<?>");

        let mut resources: Vec<String> = self
            .config
            .resources
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        resources.sort();

        let mut env: Vec<String> = self
            .config
            .env
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        env.sort();

        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.cluster_name,
            self.source_id.location.repo,
            self.source_id.version,
            self.source_id.location.dir,
            self.config.num_instances,
            owner,
            resources.join(", "),
            env.join(", "),
        )
    }
}

impl PartialEq for Deployment {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Deployment {}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} {}", self.source_id, self.cluster_name, self.config)
    }
}
