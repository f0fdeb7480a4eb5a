//! Error types for portsweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Only configuration-fatal
//! errors reach the run boundary; per-port and per-host faults are recorded
//! in the sweep outcomes instead.

use crate::services::CatalogError;
use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scanning operations.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid port range: {0}")]
    InvalidPorts(#[from] PortError),

    #[error("Invalid target: {0}")]
    InvalidTarget(#[from] TargetError),

    #[error("Service catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Concurrency gate closed")]
    GateClosed,

    #[error("Liveness probe failed: {0}")]
    Liveness(String),
}

/// Errors raised while loading or validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Errors surfaced at the command-line boundary.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write results to {path}: {reason}")]
    OutputFailed { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PortError> for CliError {
    fn from(err: PortError) -> Self {
        Self::Scan(err.into())
    }
}

impl From<TargetError> for CliError {
    fn from(err: TargetError) -> Self {
        Self::Scan(err.into())
    }
}

impl From<CatalogError> for CliError {
    fn from(err: CatalogError) -> Self {
        Self::Scan(err.into())
    }
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type alias for settings operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for CLI command handlers.
pub type CliResult<T> = Result<T, CliError>;
