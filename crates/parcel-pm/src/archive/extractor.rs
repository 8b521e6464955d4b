//! Archive extraction.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

/// Errors raised while extracting an archive
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to open archive {path}")]
    Open {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    #[error("Failed to prepare destination {path}")]
    Destination {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    #[error("Failed to extract {entry}")]
    Entry {
        entry: String,
        #[source]
        cause: io::Error,
    },

    #[error("Path traversal detected: {entry} escapes destination directory")]
    PathTraversal { entry: String },
}

/// Archive extractor
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Extract every entry of `archive_path` into `dest_dir`, in archive order.
    ///
    /// Directories are created idempotently; files are created or truncated
    /// and get their recorded permission bits. The first failing entry aborts
    /// the extraction and entries written before it are left in place.
    /// Returns the number of entries applied.
    pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
        let mut archive = Self::open(archive_path)?;

        fs::create_dir_all(dest_dir).map_err(|cause| ExtractError::Destination {
            path: dest_dir.to_path_buf(),
            cause,
        })?;
        let dest_root = dest_dir.canonicalize().map_err(|cause| ExtractError::Destination {
            path: dest_dir.to_path_buf(),
            cause,
        })?;

        let mut applied = 0;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| ExtractError::Entry {
                entry: format!("#{}", i),
                cause: io::Error::other(e),
            })?;
            let name = entry.name().to_string();
            let fail = |cause: io::Error| ExtractError::Entry {
                entry: name.clone(),
                cause,
            };

            let relative = resolve_entry_path(&name).ok_or_else(|| ExtractError::PathTraversal {
                entry: name.clone(),
            })?;
            if relative.as_os_str().is_empty() {
                continue;
            }

            let outpath = dest_root.join(&relative);
            ensure_contained(&outpath, &dest_root, &name)?;

            if entry.is_dir() {
                fs::create_dir_all(&outpath).map_err(fail)?;
                log::debug!("Created directory {}", relative.display());
                applied += 1;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(fail)?;
            }

            let mut outfile = match File::create(&outpath) {
                Ok(file) => file,
                // a read-only file left by an earlier extraction
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied && outpath.is_file() => {
                    fs::remove_file(&outpath).map_err(fail)?;
                    File::create(&outpath).map_err(fail)?
                }
                Err(e) => return Err(fail(e)),
            };
            let written = io::copy(&mut entry, &mut outfile).map_err(fail)?;
            drop(outfile);

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&outpath, fs::Permissions::from_mode(mode & 0o777))
                        .map_err(fail)?;
                }
            }

            log::debug!("Extracted {} ({} bytes)", relative.display(), written);
            applied += 1;
        }

        log::info!(
            "Extracted {} entries from {} into {}",
            applied,
            archive_path.display(),
            dest_dir.display()
        );
        Ok(applied)
    }

    /// List the stored entry paths of an archive in container order
    pub fn entries(archive_path: &Path) -> Result<Vec<String>, ExtractError> {
        let archive = Self::open(archive_path)?;
        Ok((0..archive.len())
            .filter_map(|i| archive.name_for_index(i))
            .map(str::to_string)
            .collect())
    }

    fn open(archive_path: &Path) -> Result<zip::ZipArchive<BufReader<File>>, ExtractError> {
        let open_err = |cause: io::Error| ExtractError::Open {
            path: archive_path.to_path_buf(),
            cause,
        };

        let file = File::open(archive_path).map_err(open_err)?;
        zip::ZipArchive::new(BufReader::new(file)).map_err(|e| open_err(io::Error::other(e)))
    }
}

/// Resolve a stored entry path to a path relative to the extraction root.
///
/// Returns `None` for absolute paths and for any `..` that would climb above
/// the root. Backslashes are treated as separators.
fn resolve_entry_path(name: &str) -> Option<PathBuf> {
    let normalized = name.replace('\\', "/");
    let mut resolved = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(resolved)
}

/// Reject `path` if its nearest existing ancestor resolves outside `root`.
///
/// Catches symlinks already present in the destination that point elsewhere.
fn ensure_contained(path: &Path, root: &Path, entry: &str) -> Result<(), ExtractError> {
    let traversal = || ExtractError::PathTraversal {
        entry: entry.to_string(),
    };

    let existing = path
        .ancestors()
        .find(|candidate| fs::symlink_metadata(candidate).is_ok())
        .ok_or_else(traversal)?;
    let resolved = existing.canonicalize().map_err(|_| traversal())?;

    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(traversal())
    }
}
