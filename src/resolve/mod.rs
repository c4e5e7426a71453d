// ABOUTME: One reconciliation pass from intended state to rectified clusters.
// ABOUTME: Exports the resolver, its options and its error types.

mod error;
mod resolver;

pub use error::{ImageNameFailure, MissingImageNamesError, ResolveError, ResolveErrorKind};
pub use resolver::{ResolveOptions, ResolveReport, Resolver};
