// ABOUTME: Persists intended-state manifests on a remote HTTP store.
// ABOUTME: Conditional requests (If-Match / If-None-Match) give compare-and-swap writes.

mod error;
mod http;

pub use error::StoreError;
pub use http::{DEFAULT_TIMEOUT, HttpStateManager, PublishReport, StoredManifests, Versioned};
