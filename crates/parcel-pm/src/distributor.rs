//! The `create` and `update` commands.
//!
//! Both commands are strictly sequential and fail fast. Nothing is rolled
//! back on failure: a built archive stays on disk when its upload fails, and
//! dependencies extracted before a failing one stay applied. Re-running
//! `update` starts again from the first dependency.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::archive::{ArchiveBuilder, ArchiveExtractor, ArchiveHandle, BuildError, ExtractError};
use crate::event::{DistributionEvent, EventDispatcher, EventListener};
use crate::json::{load_manifest, DependencyRef, Manifest, ManifestError};
use crate::transport::{RemoteTransport, TransportError};

/// Step of the per-dependency cycle that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyPhase {
    Fetch,
    Extract,
}

impl fmt::Display for DependencyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyPhase::Fetch => f.write_str("fetching"),
            DependencyPhase::Extract => f.write_str("extracting"),
        }
    }
}

/// Why a single dependency could not be applied
#[derive(Debug, Error)]
pub enum DependencyFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to store {path}")]
    Store {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Terminal failure states of the `create` and `update` commands
#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("Failed to load manifest")]
    Parse(#[from] ManifestError),

    #[error("Failed to build archive")]
    Build(#[from] BuildError),

    #[error("Failed to upload {handle}")]
    Upload {
        handle: ArchiveHandle,
        /// The local archive, left in place
        archive: PathBuf,
        #[source]
        source: TransportError,
    },

    /// `index` is zero based; every dependency before it was applied
    #[error("Stopped at dependency {} of {total} ({dependency}) while {phase}", .index + 1)]
    Dependency {
        index: usize,
        total: usize,
        dependency: DependencyRef,
        phase: DependencyPhase,
        #[source]
        source: DependencyFailure,
    },
}

/// Outcome of a successful `create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReport {
    pub handle: ArchiveHandle,
    pub archive: PathBuf,
}

/// Outcome of a successful `update`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Dependencies applied, in manifest order
    pub applied: Vec<DependencyRef>,
}

/// Runs `create` and `update` against one working directory and remote store
pub struct Distributor {
    working_dir: PathBuf,
    transport: Box<dyn RemoteTransport>,
    events: EventDispatcher,
}

impl Distributor {
    pub fn new(working_dir: impl Into<PathBuf>, transport: Box<dyn RemoteTransport>) -> Self {
        Self {
            working_dir: working_dir.into(),
            transport,
            events: EventDispatcher::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.events.add_listener(listener);
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn transport(&self) -> &dyn RemoteTransport {
        &*self.transport
    }

    /// Parse the manifest at `manifest_path`, build its archive in the
    /// working directory and upload it
    pub fn create(&self, manifest_path: &Path) -> Result<CreateReport, DistributionError> {
        let manifest = load_manifest(manifest_path)?;
        self.create_from_manifest(&manifest)
    }

    /// Build and upload the archive for an already parsed manifest
    pub fn create_from_manifest(&self, manifest: &Manifest) -> Result<CreateReport, DistributionError> {
        self.events.dispatch(DistributionEvent::CreateStarted { manifest });

        let handle = ArchiveBuilder::build(manifest, &self.working_dir)?;
        let archive = handle.path_in(&self.working_dir);
        self.events.dispatch(DistributionEvent::ArchiveBuilt {
            handle: &handle,
            path: &archive,
        });

        if let Err(source) = self.upload(&handle, &archive) {
            log::warn!("Upload of {} failed; {} kept", handle, archive.display());
            return Err(DistributionError::Upload {
                handle,
                archive,
                source,
            });
        }

        let endpoint = self.transport.endpoint();
        log::info!("Uploaded {} to {}", handle, endpoint);
        self.events.dispatch(DistributionEvent::Uploaded {
            handle: &handle,
            endpoint: &endpoint,
        });

        Ok(CreateReport { handle, archive })
    }

    fn upload(&self, handle: &ArchiveHandle, archive: &Path) -> Result<(), TransportError> {
        let file = File::open(archive).map_err(|e| TransportError::Other {
            name: handle.name().to_string(),
            reason: format!("cannot read {}: {}", archive.display(), e),
        })?;
        self.transport.put(handle.name(), &mut BufReader::new(file))
    }

    /// Parse the manifest at `manifest_path`, then fetch and extract each
    /// listed dependency in order
    pub fn update(&self, manifest_path: &Path) -> Result<UpdateReport, DistributionError> {
        let manifest = load_manifest(manifest_path)?;
        self.update_from_manifest(&manifest)
    }

    /// Fetch and extract the dependencies of an already parsed manifest
    pub fn update_from_manifest(&self, manifest: &Manifest) -> Result<UpdateReport, DistributionError> {
        let total = manifest.dependencies.len();
        self.events.dispatch(DistributionEvent::UpdateStarted { manifest, total });
        log::debug!("Updating {} dependencies of {}", total, manifest.name);

        let mut applied = Vec::with_capacity(total);
        for (index, dependency) in manifest.dependencies.iter().enumerate() {
            let stopped = |phase: DependencyPhase, source: DependencyFailure| {
                log::warn!(
                    "Stopping update at {} ({} of {}); {} earlier dependencies stay applied",
                    dependency,
                    index + 1,
                    total,
                    index
                );
                DistributionError::Dependency {
                    index,
                    total,
                    dependency: dependency.clone(),
                    phase,
                    source,
                }
            };

            let handle = ArchiveHandle::for_dependency(dependency);

            self.events.dispatch(DistributionEvent::Fetching { index, total, dependency });
            let (archive, bytes) = self
                .fetch(&handle)
                .map_err(|source| stopped(DependencyPhase::Fetch, source))?;
            self.events.dispatch(DistributionEvent::Fetched {
                index,
                total,
                dependency,
                bytes,
            });

            let entries = ArchiveExtractor::extract(&archive, &self.working_dir)
                .map_err(|source| stopped(DependencyPhase::Extract, source.into()))?;
            self.events.dispatch(DistributionEvent::Extracted {
                index,
                total,
                dependency,
                entries,
            });

            log::info!("Applied {} ({} of {})", dependency, index + 1, total);
            applied.push(dependency.clone());
        }

        self.events.dispatch(DistributionEvent::UpdateFinished {
            applied: applied.len(),
        });
        Ok(UpdateReport { applied })
    }

    /// Download an archive into the working directory under its own name.
    ///
    /// The download is staged and only renamed once complete, so an
    /// interrupted transfer never replaces a good local copy.
    fn fetch(&self, handle: &ArchiveHandle) -> Result<(PathBuf, u64), DependencyFailure> {
        let dest = handle.path_in(&self.working_dir);
        let store_err = |cause: io::Error| DependencyFailure::Store {
            path: dest.clone(),
            cause,
        };

        let mut content = self.transport.get(handle.name())?;

        let mut staging = tempfile::Builder::new()
            .prefix(".parcel-")
            .suffix(".zip.part")
            .tempfile_in(&self.working_dir)
            .map_err(store_err)?;
        let bytes = io::copy(&mut content, &mut staging).map_err(store_err)?;
        staging.persist(&dest).map_err(|e| store_err(e.error))?;

        log::debug!("Fetched {} ({} bytes)", handle, bytes);
        Ok((dest, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::write_manifest;
    use crate::transport::{MemoryTransport, TransportRequest};
    use std::fs;
    use tempfile::TempDir;

    fn distributor(dir: &Path, store: &MemoryTransport) -> Distributor {
        Distributor::new(dir, Box::new(store.clone()))
    }

    #[test]
    fn test_create_uploads_under_archive_name() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "alpha").unwrap();
        let manifest_path = temp.path().join("parcel.json");
        write_manifest(&manifest_path, &Manifest::new("app", "1.0").with_file("a.txt")).unwrap();

        let store = MemoryTransport::new();
        let report = distributor(temp.path(), &store).create(&manifest_path).unwrap();

        assert_eq!(report.handle.name(), "app_1.0.zip");
        assert_eq!(report.archive, temp.path().join("app_1.0.zip"));
        assert_eq!(store.names(), vec!["app_1.0.zip"]);
        assert_eq!(store.blob("app_1.0.zip").unwrap(), fs::read(&report.archive).unwrap());
    }

    #[test]
    fn test_create_parse_failure() {
        let temp = TempDir::new().unwrap();
        let manifest_path = temp.path().join("parcel.json");
        fs::write(&manifest_path, r#"{ "ver": "1" }"#).unwrap();

        let store = MemoryTransport::new();
        let err = distributor(temp.path(), &store).create(&manifest_path).unwrap_err();

        assert!(matches!(err, DistributionError::Parse(ManifestError::Malformed(_))));
        assert!(store.requests().is_empty());
    }

    #[test]
    fn test_create_build_failure_skips_upload() {
        let temp = TempDir::new().unwrap();
        let store = MemoryTransport::new();
        let manifest = Manifest::new("app", "1").with_file("missing.txt");

        let err = distributor(temp.path(), &store)
            .create_from_manifest(&manifest)
            .unwrap_err();

        match err {
            DistributionError::Build(e) => assert_eq!(e.path, "missing.txt"),
            other => panic!("expected build failure, got {:?}", other),
        }
        assert!(store.requests().is_empty());
    }

    #[test]
    fn test_create_upload_failure_keeps_archive() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "alpha").unwrap();

        let store = MemoryTransport::new();
        store.fail_on(
            "app_1.zip",
            TransportError::ConnectionFailed {
                endpoint: "memory".to_string(),
                reason: "refused".to_string(),
            },
        );

        let manifest = Manifest::new("app", "1").with_file("a.txt");
        let err = distributor(temp.path(), &store)
            .create_from_manifest(&manifest)
            .unwrap_err();

        match err {
            DistributionError::Upload { archive, source, .. } => {
                assert!(archive.exists());
                assert!(matches!(source, TransportError::ConnectionFailed { .. }));
            }
            other => panic!("expected upload failure, got {:?}", other),
        }
    }

    #[test]
    fn test_update_without_dependencies() {
        let temp = TempDir::new().unwrap();
        let store = MemoryTransport::new();

        let report = distributor(temp.path(), &store)
            .update_from_manifest(&Manifest::new("app", "1"))
            .unwrap();

        assert!(report.applied.is_empty());
        assert!(store.requests().is_empty());
    }

    #[test]
    fn test_update_corrupt_archive_stops_at_extract() {
        let temp = TempDir::new().unwrap();
        let store = MemoryTransport::new();
        store.insert("broken_1.zip", "not a zip");

        let manifest = Manifest::new("app", "1").with_dependency("broken", "1");
        let err = distributor(temp.path(), &store)
            .update_from_manifest(&manifest)
            .unwrap_err();

        match err {
            DistributionError::Dependency { index, total, phase, .. } => {
                assert_eq!(index, 0);
                assert_eq!(total, 1);
                assert_eq!(phase, DependencyPhase::Extract);
            }
            other => panic!("expected dependency failure, got {:?}", other),
        }
        // the fetched archive stays next to the working files
        assert!(temp.path().join("broken_1.zip").exists());
    }

    #[test]
    fn test_update_requests_in_manifest_order() {
        let source = TempDir::new().unwrap();
        let store = MemoryTransport::new();
        for (name, file) in [("zeta", "z.txt"), ("alpha", "a.txt")] {
            fs::write(source.path().join(file), name).unwrap();
            let manifest = Manifest::new(name, "1").with_file(file);
            distributor(source.path(), &store).create_from_manifest(&manifest).unwrap();
        }

        let target = TempDir::new().unwrap();
        let manifest = Manifest::new("app", "1")
            .with_dependency("zeta", "1")
            .with_dependency("alpha", "1");
        let fetcher = MemoryTransport::new();
        for name in store.names() {
            fetcher.insert(name.clone(), store.blob(&name).unwrap());
        }

        distributor(target.path(), &fetcher).update_from_manifest(&manifest).unwrap();

        assert_eq!(
            fetcher.requests(),
            vec![
                TransportRequest::Get("zeta_1.zip".to_string()),
                TransportRequest::Get("alpha_1.zip".to_string()),
            ]
        );
        assert_eq!(fs::read_to_string(target.path().join("z.txt")).unwrap(), "zeta");
        assert_eq!(fs::read_to_string(target.path().join("a.txt")).unwrap(), "alpha");
    }

    #[test]
    fn test_dependency_error_message() {
        let err = DistributionError::Dependency {
            index: 1,
            total: 3,
            dependency: DependencyRef::new("B", "2"),
            phase: DependencyPhase::Fetch,
            source: TransportError::NotFound {
                name: "B_2.zip".to_string(),
            }
            .into(),
        };
        assert_eq!(err.to_string(), "Stopped at dependency 2 of 3 (B@2) while fetching");

        // each cause is rendered once along the chain
        let chain: Vec<String> = std::iter::successors(
            Some(&err as &(dyn std::error::Error + 'static)),
            |e| e.source(),
        )
        .map(|e| e.to_string())
        .collect();
        assert_eq!(
            chain,
            vec![
                "Stopped at dependency 2 of 3 (B@2) while fetching",
                "B_2.zip not found on remote",
            ]
        );
    }

    #[test]
    fn test_build_error_chain_names_cause_once() {
        let temp = TempDir::new().unwrap();
        let store = MemoryTransport::new();
        let manifest = Manifest::new("app", "1").with_file("missing.txt");

        let err = distributor(temp.path(), &store)
            .create_from_manifest(&manifest)
            .unwrap_err();

        let chain: Vec<String> = std::iter::successors(
            Some(&err as &(dyn std::error::Error + 'static)),
            |e| e.source(),
        )
        .map(|e| e.to_string())
        .collect();
        assert_eq!(chain[0], "Failed to build archive");
        assert_eq!(chain[1], "Failed to archive missing.txt");
        assert_eq!(chain.len(), 3);
    }
}
