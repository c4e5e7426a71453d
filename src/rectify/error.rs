// ABOUTME: Per-deployment rectification failures.
// ABOUTME: Collected and reported; never abort sibling work.

use super::client::ClientError;
use crate::types::DeployId;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Delete,
    Modify,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Delete => write!(f, "delete"),
            Action::Modify => write!(f, "modify"),
        }
    }
}

/// Why a single unit of rectification did not complete.
#[derive(Debug, thiserror::Error)]
pub enum UnitFailure {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("task panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to {action} {id}: {cause}")]
pub struct RectificationError {
    pub id: DeployId,
    pub action: Action,
    #[source]
    pub cause: UnitFailure,
}

impl RectificationError {
    pub fn new(id: DeployId, action: Action, cause: UnitFailure) -> Self {
        Self { id, action, cause }
    }
}
