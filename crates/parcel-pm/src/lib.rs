pub mod archive;
pub mod config;
pub mod distributor;
pub mod error;
pub mod event;
pub mod json;
pub mod transport;

pub use error::{ParcelError, Result};
pub use archive::{ArchiveBuilder, ArchiveExtractor, ArchiveHandle, BuildError, ExtractError};
pub use config::{Config, ConfigLoader, RemoteConfig};
pub use distributor::{
    CreateReport, DependencyFailure, DependencyPhase, DistributionError, Distributor, UpdateReport,
};
pub use event::{DistributionEvent, EventDispatcher, EventListener};
pub use json::{load_manifest, parse_manifest, DependencyRef, Manifest, ManifestError};
pub use transport::{
    from_config as transport_from_config, DirectoryTransport, HttpTransport, MemoryTransport,
    RemoteTransport, TransportError,
};
