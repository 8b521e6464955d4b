//! Archive construction from a manifest's file list.

use std::collections::HashSet;
use std::fs::{self, File, Metadata};
use std::io::{self, Seek, Write};
use std::path::Path;
use std::time::SystemTime;

use chrono::{Datelike, Timelike, Utc};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::handle::ArchiveHandle;
use crate::json::Manifest;

/// A listed file could not be added, or the archive could not be written
#[derive(Debug, thiserror::Error)]
#[error("Failed to archive {path}")]
pub struct BuildError {
    /// The offending manifest path, or the archive path for container failures
    pub path: String,
    #[source]
    pub cause: io::Error,
}

impl BuildError {
    fn new(path: impl Into<String>, cause: io::Error) -> Self {
        Self {
            path: path.into(),
            cause,
        }
    }
}

/// Archive builder
pub struct ArchiveBuilder;

impl ArchiveBuilder {
    /// Build the archive for `manifest` inside `base_dir`.
    ///
    /// Each entry in `manifest.files` is read from `base_dir/<path>` and
    /// stored under the path string exactly as listed, in listed order.
    /// A path listed again is skipped; its first occurrence keeps its place.
    /// The archive is staged in a temporary file and only renamed to its
    /// final name once complete; a failed build leaves nothing under that name.
    pub fn build(manifest: &Manifest, base_dir: &Path) -> Result<ArchiveHandle, BuildError> {
        let handle = ArchiveHandle::for_manifest(manifest);
        let dest = handle.path_in(base_dir);
        let dest_display = dest.display().to_string();
        let entries;

        let staging = tempfile::Builder::new()
            .prefix(".parcel-")
            .suffix(".zip.part")
            .tempfile_in(base_dir)
            .map_err(|e| BuildError::new(dest_display.as_str(), e))?;

        {
            let mut zip = ZipWriter::new(staging.as_file());
            let mut seen = HashSet::new();

            for path in &manifest.files {
                if !seen.insert(path.as_str()) {
                    log::warn!("Skipping {}: already listed in {}", path, handle);
                    continue;
                }
                Self::add_entry(&mut zip, base_dir, path)?;
            }
            entries = seen.len();

            zip.finish()
                .map_err(|e| BuildError::new(dest_display.as_str(), io::Error::other(e)))?;
        }

        staging
            .persist(&dest)
            .map_err(|e| BuildError::new(dest_display.as_str(), e.error))?;

        log::info!(
            "Built {} ({} entries) in {}",
            handle,
            entries,
            base_dir.display()
        );
        Ok(handle)
    }

    fn add_entry<W: Write + Seek>(
        zip: &mut ZipWriter<W>,
        base_dir: &Path,
        path: &str,
    ) -> Result<(), BuildError> {
        let fail = |cause: io::Error| BuildError::new(path, cause);
        let source = base_dir.join(path);

        let metadata = fs::metadata(&source).map_err(fail)?;
        let options = entry_options(&metadata);

        if metadata.is_dir() {
            zip.add_directory(path, options)
                .map_err(|e| fail(io::Error::other(e)))?;
            log::debug!("Added directory {}", path);
            return Ok(());
        }

        let mut file = File::open(&source).map_err(fail)?;
        zip.start_file(path, options)
            .map_err(|e| fail(io::Error::other(e)))?;
        let written = io::copy(&mut file, zip).map_err(fail)?;

        log::debug!("Added {} ({} bytes)", path, written);
        Ok(())
    }
}

/// Synthesize the entry header from the source file's metadata
fn entry_options(metadata: &Metadata) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= u64::from(u32::MAX));

    if let Some(timestamp) = metadata.modified().ok().and_then(zip_timestamp) {
        options = options.last_modified_time(timestamp);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options = options.unix_permissions(metadata.permissions().mode() & 0o7777);
    }

    options
}

// zip timestamps cannot represent dates before 1980
fn zip_timestamp(time: SystemTime) -> Option<zip::DateTime> {
    let utc: chrono::DateTime<Utc> = time.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(utc.year()).ok()?,
        utc.month() as u8,
        utc.day() as u8,
        utc.hour() as u8,
        utc.minute() as u8,
        utc.second() as u8,
    )
    .ok()
}
