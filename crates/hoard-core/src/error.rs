use std::path::PathBuf;

use thiserror::Error;

use crate::classify::Tier;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Scan root is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("A scan can only be started from the idle state (currently {0})")]
    ScanNotIdle(&'static str),

    #[error("Scan worker failed: {0}")]
    WorkerFailed(String),

    #[error("Only {} files may be deleted, plan targets {}", Tier::Safe, .0)]
    TierNotEligible(Tier),
}
