// ABOUTME: Operator settings (converge.yml) and the state-directory loader.
// ABOUTME: Handles YAML parsing, discovery and conversion into engine options.

mod state_dir;

pub use state_dir::{CLUSTERS_FILENAME, MANIFESTS_DIR, load_state};

use crate::error::{Error, Result};
use crate::rectify::{DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY};
use crate::resolve::ResolveOptions;
use crate::store::HttpStateManager;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "converge.yml";
pub const CONFIG_FILENAME_ALT: &str = "converge.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".converge/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Base URL of the manifest state server.
    #[serde(default)]
    pub server: Option<String>,

    /// Scheduler commands in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Time allowed for each network call.
    #[serde(default = "default_call_timeout", with = "humantime_serde")]
    pub call_timeout: Duration,

    /// Deadline for a whole reconciliation pass.
    #[serde(default, with = "humantime_serde")]
    pub pass_timeout: Option<Duration>,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_call_timeout() -> Duration {
    DEFAULT_CALL_TIMEOUT
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: None,
            concurrency: default_concurrency(),
            call_timeout: default_call_timeout(),
            pass_timeout: None,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading settings");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like [`Settings::discover`], but falls back to defaults when no file exists.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "call_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            concurrency: self.concurrency,
            call_timeout: self.call_timeout,
            pass_timeout: self.pass_timeout,
        }
    }

    /// Client for the configured state server.
    pub fn state_manager(&self) -> Result<HttpStateManager> {
        let server = self.server.as_deref().ok_or(Error::NoServer)?;
        Ok(HttpStateManager::new(server)?.with_timeout(self.call_timeout))
    }
}
