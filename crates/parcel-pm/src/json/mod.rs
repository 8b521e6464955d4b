//! Package manifest model and loading.

mod loader;
mod schema;

pub use loader::{load_manifest, parse_manifest, validate_manifest, write_manifest, ManifestError};
pub use schema::{DependencyRef, Manifest};
