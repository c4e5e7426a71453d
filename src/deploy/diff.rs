// ABOUTME: Classifies two deployment collections into new, gone, same and changed.
// ABOUTME: Pure function over snapshots of both inputs.

use super::deployment::Deployment;
use super::deployments::Deployments;
use crate::types::DeployId;
use std::collections::HashMap;
use std::sync::Arc;

/// A deployment present on both sides whose identity fields differ.
#[derive(Debug, Clone)]
pub struct DeploymentPair {
    pub id: DeployId,
    /// What currently runs.
    pub prior: Arc<Deployment>,
    /// What should run.
    pub post: Arc<Deployment>,
}

/// Every id from either input lands in exactly one bucket.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Only intended: to be created.
    pub new: Deployments,
    /// Only existing: to be deleted.
    pub gone: Deployments,
    /// On both sides and equal: nothing to do.
    pub same: Deployments,
    /// On both sides and unequal: to be modified. Sorted by id.
    pub changed: Vec<DeploymentPair>,
}

impl DiffResult {
    /// True when nothing needs rectifying.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.gone.is_empty() && self.changed.is_empty()
    }

    /// Number of classified ids across all buckets.
    pub fn len(&self) -> usize {
        self.new.len() + self.gone.len() + self.same.len() + self.changed.len()
    }
}

/// Compare what exists against what is intended.
pub fn diff(existing: &Deployments, intended: &Deployments) -> DiffResult {
    let existing = existing.snapshot();
    let mut intended: HashMap<DeployId, Arc<Deployment>> = intended.snapshot();

    let mut gone = HashMap::new();
    let mut same = HashMap::new();
    let mut changed = Vec::new();

    // Entries keep the key they were stored under, so every id from either
    // side lands in exactly one bucket.
    for (id, prior) in existing {
        match intended.remove(&id) {
            None => {
                gone.insert(id, prior);
            }
            Some(post) if *post == *prior => {
                same.insert(id, post);
            }
            Some(post) => changed.push(DeploymentPair { id, prior, post }),
        }
    }

    changed.sort_by(|a, b| a.id.cmp(&b.id));
    let result = DiffResult {
        new: Deployments::from_snapshot(intended),
        gone: Deployments::from_snapshot(gone),
        same: Deployments::from_snapshot(same),
        changed,
    };

    tracing::debug!(
        new = result.new.len(),
        gone = result.gone.len(),
        same = result.same.len(),
        changed = result.changed.len(),
        "computed deployment diff"
    );

    result
}

impl Deployments {
    /// Diff `self` (what exists) against `intended`.
    pub fn diff(&self, intended: &Deployments) -> DiffResult {
        diff(self, intended)
    }
}
