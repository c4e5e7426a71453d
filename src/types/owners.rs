// ABOUTME: Set of named owners attached to manifests and deployments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerSet(BTreeSet<String>);

impl OwnerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an owner. Returns false if it was already present.
    pub fn add(&mut self, owner: impl Into<String>) -> bool {
        self.0.insert(owner.into())
    }

    pub fn remove(&mut self, owner: &str) -> bool {
        self.0.remove(owner)
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.0.contains(owner)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for OwnerSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
