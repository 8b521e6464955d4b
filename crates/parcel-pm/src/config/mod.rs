//! Configuration management
//!
//! Settings are merged from several sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. Global `config.json` in `PARCEL_HOME` (or the platform config directory)
//! 3. Environment variables (`PARCEL_REMOTE_URL`, `PARCEL_REMOTE_USER`,
//!    `PARCEL_REMOTE_PASSWORD`, `PARCEL_REMOTE_TIMEOUT`,
//!    `PARCEL_REMOTE_CONNECT_TIMEOUT`, `PARCEL_REMOTE_MAX_RETRIES`)
//! 4. Explicit overrides such as command line flags
//!
//! A global `config.json` looks like:
//!
//! ```json
//! {
//!     "remote": {
//!         "url": "https://packages.example.com/store/",
//!         "username": "deploy",
//!         "timeout": 120,
//!         "max-retries": 5
//!     }
//! }
//! ```

mod config;
mod source;

pub use config::{Config, ConfigError, RemoteConfig};
pub use source::{ConfigLoader, ConfigSource, RawConfig, RawRemoteConfig};
