// ABOUTME: Per-deployment runtime configuration: instances, env, resources, volumes.
// ABOUTME: Compared structurally when diffing intended against actual state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Suggested number of running instances.
    pub num_instances: u32,
    /// Environment variables. Key order is irrelevant.
    pub env: HashMap<String, String>,
    /// Resource requests, e.g. `cpus`, `memory`, `ports`.
    pub resources: HashMap<String, String>,
    /// Volume mounts, in mount order.
    pub volumes: Vec<Volume>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            num_instances: 1,
            env: HashMap::new(),
            resources: HashMap::new(),
            volumes: Vec::new(),
        }
    }
}

impl DeployConfig {
    /// Fill in environment variables the config does not set itself.
    pub fn with_env_defaults(mut self, defaults: &HashMap<String, String>) -> Self {
        for (k, v) in defaults {
            self.env.entry(k.clone()).or_insert_with(|| v.clone());
        }
        self
    }
}

impl fmt::Display for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} env:{} resources:{} volumes:{}",
            self.num_instances,
            self.env.len(),
            self.resources.len(),
            self.volumes.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub host: String,
    pub container: String,
    #[serde(default)]
    pub mode: VolumeMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeMode {
    #[default]
    RO,
    RW,
}
