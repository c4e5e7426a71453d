// ABOUTME: Category of software a manifest describes.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestKind {
    /// Long-running service answering requests.
    #[default]
    HttpService,
    /// Job run on a schedule.
    Scheduled,
    /// Job run when explicitly triggered.
    OnDemand,
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::HttpService => write!(f, "http-service"),
            ManifestKind::Scheduled => write!(f, "scheduled"),
            ManifestKind::OnDemand => write!(f, "on-demand"),
        }
    }
}
