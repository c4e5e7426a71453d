// ABOUTME: Identity and value types shared by manifests and deployments.
// ABOUTME: Source coordinates, manifest and deploy identifiers, owners, kinds.

mod id;
mod kind;
mod owners;
mod source;

pub use id::{DeployId, ManifestId};
pub use kind::ManifestKind;
pub use owners::OwnerSet;
pub use source::{SourceId, SourceLocation, VersionError, parse_version};
pub(crate) use source::is_zero;
