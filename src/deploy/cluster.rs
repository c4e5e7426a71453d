// ABOUTME: Named deployment targets and the read-only lookup table over them.
// ABOUTME: The table is built once from configuration and shared by handle.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Filled from the key the cluster is configured under.
    #[serde(skip)]
    pub name: String,
    /// Base URL of the cluster's scheduler.
    pub base_url: String,
    /// Environment defaults for every deployment in this cluster.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            env: HashMap::new(),
        }
    }
}

/// Cluster lookup table. Cloning shares the underlying table.
#[derive(Debug, Clone, Default)]
pub struct Clusters(Arc<BTreeMap<String, Arc<Cluster>>>);

impl Clusters {
    pub fn get(&self, name: &str) -> Option<&Arc<Cluster>> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Cluster>> {
        self.0.values()
    }

    /// Distinct scheduler base URLs, sorted.
    pub fn base_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.0.values().map(|c| c.base_url.clone()).collect();
        urls.sort();
        urls.dedup();
        urls
    }
}

impl FromIterator<Cluster> for Clusters {
    fn from_iter<I: IntoIterator<Item = Cluster>>(iter: I) -> Self {
        Self(Arc::new(
            iter.into_iter()
                .map(|c| (c.name.clone(), Arc::new(c)))
                .collect(),
        ))
    }
}

impl From<BTreeMap<String, Cluster>> for Clusters {
    fn from(map: BTreeMap<String, Cluster>) -> Self {
        map.into_iter()
            .map(|(name, mut cluster)| {
                cluster.name = name;
                cluster
            })
            .collect()
    }
}
