use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::source::{ConfigLoader, ConfigSource, RawConfig, RawRemoteConfig};

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Errors raised while assembling configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("No remote configured; set remote.url in config.json, PARCEL_REMOTE_URL or --remote")]
    MissingRemote,

    #[error("Invalid remote location {location:?}: {reason}")]
    InvalidRemote { location: String, reason: String },
}

/// Connection settings for the remote package store.
///
/// Credentials are opaque to the core and handed to the transport as is.
#[derive(Clone, PartialEq)]
pub struct RemoteConfig {
    /// `http(s)://` endpoint, `file://` URL or plain directory path
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Whole-request timeout in seconds
    pub timeout: u64,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Retries performed by the transport itself
    pub max_retries: u32,
}

impl RemoteConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

// keep the password out of logs
impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Effective configuration for one command invocation
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub remote: RemoteConfig,

    /// Where each `remote.*` value came from
    sources: HashMap<String, ConfigSource>,
}

impl Config {
    /// Build configuration from defaults, the global config file and (optionally)
    /// the environment, in increasing priority.
    pub fn build(use_environment: bool) -> Result<Self, ConfigError> {
        Self::build_with(&ConfigLoader::new(use_environment))
    }

    /// Build configuration using an explicit loader
    pub fn build_with(loader: &ConfigLoader) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let global = loader.load_global_config()?;
        config.merge(global, ConfigSource::Global);
        config.apply_environment(loader)?;

        log::debug!("Remote configuration: {:?}", config.remote);
        Ok(config)
    }

    /// Merge a raw config over the current values
    pub fn merge(&mut self, raw: RawConfig, source: ConfigSource) {
        let Some(remote) = raw.remote else {
            return;
        };
        let RawRemoteConfig {
            url,
            username,
            password,
            timeout,
            connect_timeout,
            max_retries,
        } = remote;

        if let Some(url) = url {
            self.remote.url = Some(url);
            self.record("url", source.clone());
        }
        if let Some(username) = username {
            self.remote.username = Some(username);
            self.record("username", source.clone());
        }
        if let Some(password) = password {
            self.remote.password = Some(password);
            self.record("password", source.clone());
        }
        if let Some(timeout) = timeout {
            self.remote.timeout = timeout;
            self.record("timeout", source.clone());
        }
        if let Some(connect_timeout) = connect_timeout {
            self.remote.connect_timeout = connect_timeout;
            self.record("connect-timeout", source.clone());
        }
        if let Some(max_retries) = max_retries {
            self.remote.max_retries = max_retries;
            self.record("max-retries", source);
        }
    }

    fn apply_environment(&mut self, loader: &ConfigLoader) -> Result<(), ConfigError> {
        let max_retries = loader
            .get_env_u64("remote-max-retries")?
            .map(|n| {
                u32::try_from(n).map_err(|_| ConfigError::InvalidValue {
                    key: ConfigLoader::env_name("remote-max-retries"),
                    value: n.to_string(),
                })
            })
            .transpose()?;

        let env = RawRemoteConfig {
            url: loader.get_env_config("remote-url"),
            username: loader.get_env_config("remote-user"),
            password: loader.get_env_config("remote-password"),
            timeout: loader.get_env_u64("remote-timeout")?,
            connect_timeout: loader.get_env_u64("remote-connect-timeout")?,
            max_retries,
        };

        self.merge(
            RawConfig { remote: Some(env) },
            ConfigSource::Environment("PARCEL_*".to_string()),
        );
        Ok(())
    }

    /// Override the remote location, e.g. from a command line flag
    pub fn set_remote_url(&mut self, url: impl Into<String>) {
        self.remote.url = Some(url.into());
        self.record("url", ConfigSource::Command);
    }

    /// Where the given `remote.*` key was last set from
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.sources.get(key).cloned().unwrap_or(ConfigSource::Default)
    }

    fn record(&mut self, key: &str, source: ConfigSource) {
        self.sources.insert(key.to_string(), source);
    }
}
