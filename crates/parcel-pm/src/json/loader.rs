use std::fs;
use std::path::{Path, PathBuf};

use super::schema::Manifest;

/// Errors that can occur when loading a package manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ManifestError {
    fn from(e: serde_json::Error) -> Self {
        ManifestError::Malformed(e.to_string())
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    log::debug!("Reading {}", path.display());
    let content = fs::read(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&content)
}

/// Parse a manifest document.
///
/// Unknown fields are ignored and absent `targets`/`packages` lists are empty.
/// Neither listed files nor dependencies are checked for existence here.
pub fn parse_manifest(document: &[u8]) -> Result<Manifest, ManifestError> {
    let manifest: Manifest = serde_json::from_slice(document)?;
    validate_manifest(&manifest).map_err(|errors| ManifestError::Malformed(errors.join("; ")))?;
    Ok(manifest)
}

/// Check the fields that address archives are usable
pub fn validate_manifest(manifest: &Manifest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if manifest.name.trim().is_empty() {
        errors.push("Package name cannot be empty".to_string());
    }

    if manifest.version.trim().is_empty() {
        errors.push("Package version cannot be empty".to_string());
    }

    for (index, dep) in manifest.dependencies.iter().enumerate() {
        if dep.name.trim().is_empty() {
            errors.push(format!("Dependency #{} has an empty name", index));
        }
        if dep.version.trim().is_empty() {
            errors.push(format!("Dependency #{} ({}) has an empty version", index, dep.name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Write a manifest to a file
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
    let content = serde_json::to_string_pretty(manifest)?;
    fs::write(path, content).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
