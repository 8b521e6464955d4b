//! Archive naming.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::json::{DependencyRef, Manifest};

/// File extension of every package archive
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Identifies a package archive by its file name.
///
/// The name is the only key used to address an archive, both in the working
/// directory and on the remote store, so it is derived in exactly one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveHandle {
    name: String,
}

impl ArchiveHandle {
    /// Derive the handle for a package version.
    ///
    /// Produces `<name>_<version>.zip`. `%`, `_`, `/` and `\` inside either
    /// component are percent-escaped, so the one literal `_` is always the
    /// separator and the name never contains a path separator.
    pub fn new(package: &str, version: &str) -> Self {
        Self {
            name: format!(
                "{}_{}.{}",
                escape_component(package),
                escape_component(version),
                ARCHIVE_EXTENSION
            ),
        }
    }

    pub fn for_manifest(manifest: &Manifest) -> Self {
        Self::new(&manifest.name, &manifest.version)
    }

    pub fn for_dependency(dependency: &DependencyRef) -> Self {
        Self::new(&dependency.name, &dependency.version)
    }

    /// The archive file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of this archive inside `dir`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.name)
    }
}

impl fmt::Display for ArchiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn escape_component(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '_' => escaped.push_str("%5F"),
            '/' => escaped.push_str("%2F"),
            '\\' => escaped.push_str("%5C"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_plain_name() {
        assert_eq!(ArchiveHandle::new("app", "1.0.0").name(), "app_1.0.0.zip");
        assert_eq!(ArchiveHandle::new("my-lib", "2").name(), "my-lib_2.zip");
    }

    #[test]
    fn test_manifest_and_dependency_agree() {
        let manifest = Manifest::new("libfoo", "1.2");
        let dependency = DependencyRef::new("libfoo", "1.2");

        assert_eq!(
            ArchiveHandle::for_manifest(&manifest),
            ArchiveHandle::for_dependency(&dependency)
        );
    }

    #[test]
    fn test_underscore_pairs_stay_distinct() {
        let a = ArchiveHandle::new("a_b", "c");
        let b = ArchiveHandle::new("a", "b_c");

        assert_ne!(a, b);
        assert_eq!(a.name(), "a%5Fb_c.zip");
        assert_eq!(b.name(), "a_b%5Fc.zip");
    }

    #[test]
    fn test_escape_sequences_do_not_collide() {
        // a literal "%5F" must not read back as an escaped underscore
        let literal = ArchiveHandle::new("a%5F", "1");
        let escaped = ArchiveHandle::new("a_", "1");
        assert_ne!(literal, escaped);
    }

    #[test]
    fn test_no_path_separators() {
        let handle = ArchiveHandle::new("vendor/pkg", "..\\1");
        assert!(!handle.name().contains('/'));
        assert!(!handle.name().contains('\\'));
    }

    #[test]
    fn test_injective_over_sample() {
        let parts = ["", "a", "_", "a_", "_a", "a_b", "%", "%5F", "b", "1", "1_0"];
        let mut seen = HashSet::new();
        for name in parts {
            for version in parts {
                assert!(
                    seen.insert(ArchiveHandle::new(name, version)),
                    "collision for ({:?}, {:?})",
                    name,
                    version
                );
            }
        }
    }

    #[test]
    fn test_path_in() {
        let handle = ArchiveHandle::new("app", "1");
        assert_eq!(handle.path_in(Path::new("/work")), PathBuf::from("/work/app_1.zip"));
    }
}
