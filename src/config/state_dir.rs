// ABOUTME: Loads intended state from a directory of YAML documents.
// ABOUTME: clusters.yml holds the cluster table; manifests/ holds one manifest per file.

use crate::deploy::{Cluster, Clusters, Manifest, Manifests, State};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CLUSTERS_FILENAME: &str = "clusters.yml";
pub const MANIFESTS_DIR: &str = "manifests";

/// Load clusters and manifests from `dir`.
///
/// Layout:
///
/// ```text
/// dir/
///   clusters.yml        # name -> { base_url, env }
///   manifests/*.yml     # one Manifest per file
/// ```
pub fn load_state(dir: &Path) -> Result<State> {
    let clusters_path = dir.join(CLUSTERS_FILENAME);
    if !clusters_path.exists() {
        return Err(Error::ClustersNotFound(dir.to_path_buf()));
    }
    let clusters: BTreeMap<String, Cluster> = parse_file(&clusters_path)?;

    let mut manifests = Manifests::new();
    for path in manifest_files(&dir.join(MANIFESTS_DIR))? {
        let manifest: Manifest = parse_file(&path)?;
        manifests.add(manifest)?;
    }

    tracing::debug!(
        dir = %dir.display(),
        clusters = clusters.len(),
        manifests = manifests.len(),
        "loaded state directory"
    );

    Ok(State::new(manifests, Clusters::from(clusters)))
}

fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yml" || e == "yaml");
        if path.is_file() && is_yaml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}
