// ABOUTME: Concurrency-safe collection of deployments keyed by DeployId.
// ABOUTME: Built fresh per reconciliation pass; scans run over snapshots.

use super::deployment::Deployment;
use super::error::DeployError;
use crate::types::DeployId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A set of deployments with at most one entry per [`DeployId`].
///
/// Inserts take `&self`, so an `Arc<Deployments>` may be populated from
/// several tasks at once. Predicate scans copy the map first and never
/// observe a half-finished insert.
#[derive(Debug, Default)]
pub struct Deployments {
    inner: RwLock<HashMap<DeployId, Arc<Deployment>>>,
}

impl Deployments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a deployment. Fails if one with the same id is already present.
    pub fn add(&self, deployment: Deployment) -> Result<Arc<Deployment>, DeployError> {
        self.add_shared(Arc::new(deployment))
    }

    pub fn add_shared(&self, deployment: Arc<Deployment>) -> Result<Arc<Deployment>, DeployError> {
        let id = deployment.id();
        let mut inner = self.inner.write();
        if inner.contains_key(&id) {
            return Err(DeployError::DuplicateDeployment(id));
        }
        inner.insert(id, Arc::clone(&deployment));
        Ok(deployment)
    }

    pub fn get(&self, id: &DeployId) -> Option<Arc<Deployment>> {
        self.inner.read().get(id).cloned()
    }

    pub fn contains(&self, id: &DeployId) -> bool {
        self.inner.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Rebuild a collection from entries taken out of another collection's
    /// snapshot, whose keys already match their deployments' ids.
    pub(super) fn from_snapshot(entries: HashMap<DeployId, Arc<Deployment>>) -> Self {
        debug_assert!(entries.iter().all(|(id, d)| *id == d.id()));
        Deployments {
            inner: RwLock::new(entries),
        }
    }

    /// Consistent copy of the current contents.
    pub fn snapshot(&self) -> HashMap<DeployId, Arc<Deployment>> {
        self.inner.read().clone()
    }

    /// Ids in sorted order.
    pub fn ids(&self) -> Vec<DeployId> {
        let mut ids: Vec<DeployId> = self.inner.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Deployments sorted by id.
    pub fn to_vec(&self) -> Vec<Arc<Deployment>> {
        let mut entries: Vec<(DeployId, Arc<Deployment>)> = self.snapshot().into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, d)| d).collect()
    }

    /// New collection holding the deployments that match `predicate`.
    pub fn filter<F>(&self, predicate: F) -> Deployments
    where
        F: Fn(&Deployment) -> bool,
    {
        let matching = self
            .snapshot()
            .into_iter()
            .filter(|(_, d)| predicate(d))
            .collect();
        Deployments::from_snapshot(matching)
    }

    /// Some deployment matching `predicate`, if any.
    pub fn any<F>(&self, predicate: F) -> Option<Arc<Deployment>>
    where
        F: Fn(&Deployment) -> bool,
    {
        self.snapshot().into_values().find(|d| predicate(d))
    }

    pub fn try_from_iter<I>(iter: I) -> Result<Self, DeployError>
    where
        I: IntoIterator<Item = Deployment>,
    {
        let deployments = Self::new();
        for deployment in iter {
            deployments.add(deployment)?;
        }
        Ok(deployments)
    }
}

impl Clone for Deployments {
    fn clone(&self) -> Self {
        Deployments::from_snapshot(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{Annotation, DeployConfig};
    use crate::types::{ManifestKind, OwnerSet, SourceId, SourceLocation, parse_version};

    fn deployment(repo: &str, cluster: &str) -> Deployment {
        Deployment {
            config: DeployConfig::default(),
            cluster_name: cluster.to_string(),
            cluster: None,
            source_id: SourceId::new(SourceLocation::repo(repo), parse_version("1.0.0").unwrap()),
            flavor: String::new(),
            owners: OwnerSet::new(),
            kind: ManifestKind::HttpService,
            annotation: Annotation::default(),
        }
    }

    #[test]
    fn add_rejects_duplicate_ids() {
        let ds = Deployments::new();
        ds.add(deployment("one", "west")).unwrap();
        let err = ds.add(deployment("one", "west")).unwrap_err();
        assert!(matches!(err, DeployError::DuplicateDeployment(_)));
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn same_source_in_two_clusters_is_two_deployments() {
        let ds = Deployments::new();
        ds.add(deployment("one", "west")).unwrap();
        ds.add(deployment("one", "east")).unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn filter_and_any_scan_snapshots() {
        let ds = Deployments::try_from_iter([
            deployment("one", "west"),
            deployment("two", "west"),
            deployment("one", "east"),
        ])
        .unwrap();

        let west = ds.filter(|d| d.cluster_name == "west");
        assert_eq!(west.len(), 2);
        assert_eq!(ds.len(), 3);

        let found = ds.any(|d| d.source_id.location.repo == "two").unwrap();
        assert_eq!(found.cluster_name, "west");
        assert!(ds.any(|d| d.cluster_name == "north").is_none());
    }

    #[test]
    fn ids_are_sorted() {
        let ds = Deployments::try_from_iter([deployment("b", "west"), deployment("a", "west")])
            .unwrap();
        let ids = ds.ids();
        assert_eq!(ids[0].manifest_id.source.repo, "a");
        assert_eq!(ids[1].manifest_id.source.repo, "b");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_land_exactly_once() {
        let ds = Arc::new(Deployments::new());
        let mut handles = Vec::new();
        for i in 0..64 {
            let ds = Arc::clone(&ds);
            handles.push(tokio::spawn(async move {
                ds.add(deployment(&format!("repo-{}", i % 32), "west")).is_ok()
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 32);
        assert_eq!(ds.len(), 32);
    }
}
