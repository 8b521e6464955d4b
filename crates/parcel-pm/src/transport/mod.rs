//! Remote package store transports.
//!
//! The distributor only needs two operations from a remote store: `put` a
//! named blob and `get` it back. Implementations here cover a plain
//! directory (local disk or a mounted share), an HTTP endpoint accepting
//! `PUT`/`GET`, and an in-process store.

mod directory;
mod http;
mod memory;

use std::io::Read;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, RemoteConfig};

pub use directory::DirectoryTransport;
pub use http::HttpTransport;
pub use memory::{MemoryTransport, TransportRequest};

/// Errors reported by a remote store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("{name} not found on remote")]
    NotFound { name: String },

    #[error("Failed to connect to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Transfer of {name} failed: {reason}")]
    Other { name: String, reason: String },
}

/// A remote store addressed by blob name
pub trait RemoteTransport {
    /// Store `content` under `name`, replacing any existing blob
    fn put(&self, name: &str, content: &mut dyn Read) -> Result<(), TransportError>;

    /// Open the blob stored under `name`
    fn get(&self, name: &str) -> Result<Box<dyn Read + '_>, TransportError>;

    /// Human readable location of the store, for messages
    fn endpoint(&self) -> String;
}

impl<T: RemoteTransport + ?Sized> RemoteTransport for Box<T> {
    fn put(&self, name: &str, content: &mut dyn Read) -> Result<(), TransportError> {
        (**self).put(name, content)
    }

    fn get(&self, name: &str) -> Result<Box<dyn Read + '_>, TransportError> {
        (**self).get(name)
    }

    fn endpoint(&self) -> String {
        (**self).endpoint()
    }
}

/// Create the transport described by `config.url`.
///
/// `http://` and `https://` select [`HttpTransport`]; `file://` URLs and bare
/// paths select [`DirectoryTransport`].
pub fn from_config(config: &RemoteConfig) -> Result<Box<dyn RemoteTransport>, ConfigError> {
    let location = config.url.as_deref().ok_or(ConfigError::MissingRemote)?;
    let invalid = |reason: String| ConfigError::InvalidRemote {
        location: location.to_string(),
        reason,
    };

    match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            log::debug!("Using HTTP store at {}", url);
            let transport = HttpTransport::with_config(url, config).map_err(|e| invalid(e.to_string()))?;
            Ok(Box::new(transport))
        }
        Ok(url) if url.scheme() == "file" => {
            let root = url
                .to_file_path()
                .map_err(|_| invalid("not a local file URL".to_string()))?;
            log::debug!("Using directory store at {}", root.display());
            Ok(Box::new(DirectoryTransport::new(root)))
        }
        // single letters are Windows drive prefixes, not schemes
        Ok(url) if url.scheme().len() > 1 => {
            Err(invalid(format!("unsupported scheme {:?}", url.scheme())))
        }
        _ => {
            log::debug!("Using directory store at {}", location);
            Ok(Box::new(DirectoryTransport::new(PathBuf::from(location))))
        }
    }
}

/// Blob names must be a single path component
fn validate_blob_name(name: &str) -> Result<(), TransportError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(TransportError::Other {
            name: name.to_string(),
            reason: "invalid blob name".to_string(),
        });
    }
    Ok(())
}
