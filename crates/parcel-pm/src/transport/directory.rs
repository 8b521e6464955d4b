//! Directory store: each blob is a file directly under the root.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use super::{validate_blob_name, RemoteTransport, TransportError};

/// Transport backed by a local or mounted directory
#[derive(Debug, Clone)]
pub struct DirectoryTransport {
    root: PathBuf,
}

impl DirectoryTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> Result<(), TransportError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(TransportError::ConnectionFailed {
                endpoint: self.endpoint(),
                reason: "store directory does not exist".to_string(),
            })
        }
    }

    fn io_error(name: &str, error: io::Error) -> TransportError {
        match error.kind() {
            io::ErrorKind::NotFound => TransportError::NotFound {
                name: name.to_string(),
            },
            _ => TransportError::Other {
                name: name.to_string(),
                reason: error.to_string(),
            },
        }
    }
}

impl RemoteTransport for DirectoryTransport {
    fn put(&self, name: &str, content: &mut dyn Read) -> Result<(), TransportError> {
        validate_blob_name(name)?;
        self.ensure_root()?;

        let other = |e: io::Error| TransportError::Other {
            name: name.to_string(),
            reason: e.to_string(),
        };

        // readers of the store never observe a half-written blob
        let mut staging = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(&self.root)
            .map_err(other)?;
        let written = io::copy(content, &mut staging).map_err(other)?;
        staging.persist(self.root.join(name)).map_err(|e| other(e.error))?;

        log::debug!("Stored {} ({} bytes) in {}", name, written, self.root.display());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Box<dyn Read + '_>, TransportError> {
        validate_blob_name(name)?;
        self.ensure_root()?;

        let file = File::open(self.root.join(name)).map_err(|e| Self::io_error(name, e))?;
        log::debug!("Opened {} from {}", name, self.root.display());
        Ok(Box::new(BufReader::new(file)))
    }

    fn endpoint(&self) -> String {
        self.root.display().to_string()
    }
}
