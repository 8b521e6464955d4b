use thiserror::Error;

use crate::config::ConfigError;
use crate::distributor::DistributionError;

/// Failure of a command run end to end: setting up the remote store from
/// configuration, then running `create` or `update`
#[derive(Error, Debug)]
pub enum ParcelError {
    // Config errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    // Command errors
    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

pub type Result<T> = std::result::Result<T, ParcelError>;
