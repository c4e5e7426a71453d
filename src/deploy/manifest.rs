// ABOUTME: User-authored manifests: the source of truth for intended state.
// ABOUTME: Includes the manifest collection and a prior/post manifest diff.

use super::error::DeployError;
use super::spec::DeploySpec;
use crate::types::{ManifestId, ManifestKind, OwnerSet, SourceLocation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Describes how one piece of software deploys across clusters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub source: SourceLocation,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flavor: String,
    #[serde(default)]
    pub owners: OwnerSet,
    #[serde(default)]
    pub kind: ManifestKind,
    /// Cluster name to that cluster's spec.
    #[serde(default)]
    pub deployments: BTreeMap<String, DeploySpec>,
}

impl Manifest {
    pub fn id(&self) -> ManifestId {
        ManifestId::new(self.source.clone(), self.flavor.clone())
    }
}

/// The same manifest before and after an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPair {
    pub prior: Manifest,
    pub post: Manifest,
}

impl ManifestPair {
    pub fn new(prior: Manifest, post: Manifest) -> Self {
        Self { prior, post }
    }

    pub fn id(&self) -> ManifestId {
        self.post.id()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifests(BTreeMap<ManifestId, Manifest>);

impl Manifests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, manifest: Manifest) -> Result<(), DeployError> {
        let id = manifest.id();
        if self.0.contains_key(&id) {
            return Err(DeployError::DuplicateManifest(id));
        }
        self.0.insert(id, manifest);
        Ok(())
    }

    pub fn get(&self, id: &ManifestId) -> Option<&Manifest> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Manifest> {
        self.0.values()
    }

    /// Classify manifests of `prior` and `post` by id.
    pub fn diff(prior: &Manifests, post: &Manifests) -> ManifestDiff {
        let mut diff = ManifestDiff::default();

        for (id, before) in &prior.0 {
            match post.0.get(id) {
                None => diff.gone.push(before.clone()),
                Some(after) if after != before => diff
                    .changed
                    .push(ManifestPair::new(before.clone(), after.clone())),
                Some(_) => {}
            }
        }

        for (id, after) in &post.0 {
            if !prior.0.contains_key(id) {
                diff.new.push(after.clone());
            }
        }

        diff
    }

    pub fn try_from_iter<I>(iter: I) -> Result<Self, DeployError>
    where
        I: IntoIterator<Item = Manifest>,
    {
        let mut manifests = Self::new();
        for manifest in iter {
            manifests.add(manifest)?;
        }
        Ok(manifests)
    }
}

/// Manifest-level changes between two states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    pub new: Vec<Manifest>,
    pub gone: Vec<Manifest>,
    pub changed: Vec<ManifestPair>,
}

impl ManifestDiff {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.gone.is_empty() && self.changed.is_empty()
    }
}
