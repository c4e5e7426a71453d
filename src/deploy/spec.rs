// ABOUTME: A manifest's configuration for one cluster: config plus version.

use super::config::DeployConfig;
use crate::types::parse_version;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploySpec {
    #[serde(flatten)]
    pub config: DeployConfig,
    /// Version to run. Major/minor/patch name a tag in the source
    /// repository; build metadata carries the full revision.
    #[serde(deserialize_with = "deserialize_version")]
    pub version: semver::Version,
}

impl DeploySpec {
    pub fn new(config: DeployConfig, version: semver::Version) -> Self {
        Self { config, version }
    }

    pub fn is_valid(&self) -> bool {
        !crate::types::is_zero(&self.version)
    }
}

fn deserialize_version<'de, D>(deserializer: D) -> Result<semver::Version, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(VersionVisitor)
}

struct VersionVisitor;

impl serde::de::Visitor<'_> for VersionVisitor {
    type Value = semver::Version;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a quoted semantic version string such as \"1.2.3\"")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_version(v).map_err(E::custom)
    }

    // YAML reads `1.2` or `2` as a number, which cannot carry a full version.
    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Err(read_as_number(v))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Err(read_as_number(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Err(read_as_number(v))
    }
}

fn read_as_number<E: serde::de::Error>(v: impl fmt::Display) -> E {
    E::custom(format!(
        "version {} was read as a number; quote it as a full version such as \"1.2.3\"",
        v
    ))
}
