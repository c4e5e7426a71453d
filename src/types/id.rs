// ABOUTME: Identifiers for manifests and single-cluster deployments.
// ABOUTME: DeployId is the key of every deployment collection.

use super::source::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a manifest: one source location, one flavor.
///
/// Flavors allow several independent deployments of the same source, for
/// example A/B variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManifestId {
    pub source: SourceLocation,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flavor: String,
}

impl ManifestId {
    pub fn new(source: SourceLocation, flavor: impl Into<String>) -> Self {
        Self {
            source,
            flavor: flavor.into(),
        }
    }
}

impl fmt::Display for ManifestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flavor.is_empty() {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{}~{}", self.source, self.flavor)
        }
    }
}

/// Identifies one deployment instance: a manifest in a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeployId {
    pub manifest_id: ManifestId,
    pub cluster: String,
}

impl DeployId {
    pub fn new(manifest_id: ManifestId, cluster: impl Into<String>) -> Self {
        Self {
            manifest_id,
            cluster: cluster.into(),
        }
    }
}

impl fmt::Display for DeployId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.manifest_id, self.cluster)
    }
}
