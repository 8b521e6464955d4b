use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::ConfigError;

/// Represents the source of a configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default built-in value
    Default,
    /// From the global config file (`$PARCEL_HOME/config.json`)
    Global,
    /// From environment variable
    Environment(String),
    /// Programmatically set, e.g. from a command line flag
    Command,
}

impl ConfigSource {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::Global => "global",
            ConfigSource::Environment(var) => var,
            ConfigSource::Command => "command",
        }
    }
}

/// Raw configuration data as stored in `config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RawRemoteConfig>,
}

/// The `remote` section of `config.json`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawRemoteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

/// Loads configuration from files and `PARCEL_*` environment variables
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
    home: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self {
            use_environment,
            home: None,
        }
    }

    /// Use `home` instead of `PARCEL_HOME` or the platform directory
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Get a PARCEL_* environment variable
    pub fn get_parcel_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Get the parcel home directory
    pub fn get_parcel_home(&self) -> PathBuf {
        if let Some(ref home) = self.home {
            return home.clone();
        }

        if let Some(home) = self.get_parcel_env("PARCEL_HOME") {
            return PathBuf::from(home);
        }

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "parcel") {
            proj_dirs.config_dir().to_path_buf()
        } else if let Some(base_dirs) = directories::BaseDirs::new() {
            base_dirs.home_dir().join(".parcel")
        } else {
            PathBuf::from(".parcel")
        }
    }

    /// Load configuration from a JSON file; a missing file yields an empty config
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<RawConfig, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(RawConfig::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load global configuration from `<home>/config.json`
    pub fn load_global_config(&self) -> Result<RawConfig, ConfigError> {
        let config_file = self.get_parcel_home().join("config.json");
        log::debug!("Reading {}", config_file.display());
        self.load_config_file(config_file)
    }

    /// Get a configuration value from environment variable.
    /// Converts "remote-url" to "PARCEL_REMOTE_URL"
    pub fn get_env_config(&self, key: &str) -> Option<String> {
        self.get_parcel_env(&Self::env_name(key))
    }

    /// Get an unsigned integer from environment variable, rejecting garbage
    pub fn get_env_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        self.get_env_config(key)
            .map(|val| {
                val.parse().map_err(|_| ConfigError::InvalidValue {
                    key: Self::env_name(key),
                    value: val,
                })
            })
            .transpose()
    }

    pub fn env_name(key: &str) -> String {
        format!("PARCEL_{}", key.replace('-', "_").to_uppercase())
    }
}
