// ABOUTME: Source repository coordinates and exact source versions.
// ABOUTME: A SourceId pins one immutable artifact of a repository.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("invalid semantic version '{input}': {source}")]
    Invalid {
        input: String,
        source: semver::Error,
    },

    #[error("version must be non-zero")]
    Zero,
}

/// Parse a semantic version, rejecting `0.0.0`.
pub fn parse_version(input: &str) -> Result<semver::Version, VersionError> {
    let version = semver::Version::parse(input.trim()).map_err(|source| VersionError::Invalid {
        input: input.to_string(),
        source,
    })?;
    if is_zero(&version) {
        return Err(VersionError::Zero);
    }
    Ok(version)
}

pub(crate) fn is_zero(version: &semver::Version) -> bool {
    version.major == 0 && version.minor == 0 && version.patch == 0
}

/// Where the source for a piece of software lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Repository identifier, usually a clone URL.
    pub repo: String,
    /// Offset of the project inside the repository. Empty for the root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,
}

impl SourceLocation {
    pub fn new(repo: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            dir: dir.into(),
        }
    }

    pub fn repo(repo: impl Into<String>) -> Self {
        Self::new(repo, "")
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_empty() {
            write!(f, "{}", self.repo)
        } else {
            write!(f, "{},{}", self.repo, self.dir)
        }
    }
}

/// A source location at one exact version.
///
/// The version's build metadata carries the full revision identifier, so a
/// `SourceId` resolves to exactly one artifact per repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId {
    pub location: SourceLocation,
    pub version: semver::Version,
}

impl SourceId {
    pub fn new(location: SourceLocation, version: semver::Version) -> Self {
        Self { location, version }
    }

    /// Full revision identifier, if the version carries one.
    pub fn revision(&self) -> Option<&str> {
        if self.version.build.is_empty() {
            None
        } else {
            Some(self.version.build.as_str())
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.location, self.version)
    }
}
