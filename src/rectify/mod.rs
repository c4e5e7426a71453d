// ABOUTME: Drives clusters toward intended state from a classified diff.
// ABOUTME: Exports the scheduler-facing client traits and the concurrent rectifier.

mod client;
mod error;
mod rectifier;

pub use client::{ClientError, ClusterStateSource, RectificationClient};
pub use error::{Action, RectificationError, UnitFailure};
pub use rectifier::{DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY, RectifyReport, Rectifier};
