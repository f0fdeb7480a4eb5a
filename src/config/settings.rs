//! Application settings and paths.
//!
//! Settings come from a JSON file (explicit `--config` path, or
//! `settings.json` in the XDG config directory when it exists) and fall back
//! to built-in defaults. Command-line flags are applied on top by the caller.

use crate::banner::BANNER_TIMEOUT;
use crate::error::{ConfigError, ConfigResult};
use crate::scanner::gate::{DEFAULT_HOST_CONCURRENCY, DEFAULT_PORT_CONCURRENCY};
use crate::scanner::host::DEFAULT_BATCH_SIZE;
use crate::scanner::tcp::CONNECT_TIMEOUT;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portsweep)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the platform directories. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "portsweep", "portsweep")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Simultaneous port probes against one host.
    pub port_concurrency: usize,
    /// Simultaneous host sweeps in a network sweep.
    pub host_concurrency: usize,
    /// Ports launched together per batch.
    pub batch_size: usize,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Banner read timeout in milliseconds.
    pub banner_timeout_ms: u64,
    /// First port of the default range.
    pub start_port: u32,
    /// Last port of the default range.
    pub end_port: u32,
    /// IANA-style service table; the built-in table is used when unset.
    pub services_csv: Option<PathBuf>,
    /// Where to write CSV results, if anywhere.
    pub csv_output: Option<PathBuf>,
    /// Skip the ping check before sweeping hosts of a network.
    pub skip_ping: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            port_concurrency: DEFAULT_PORT_CONCURRENCY,
            host_concurrency: DEFAULT_HOST_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            connect_timeout_ms: CONNECT_TIMEOUT.as_millis() as u64,
            banner_timeout_ms: BANNER_TIMEOUT.as_millis() as u64,
            start_port: 1,
            end_port: 1024,
            services_csv: None,
            csv_output: None,
            skip_ping: false,
        }
    }
}

impl AppSettings {
    /// Load settings from `path` if given, else from the XDG location if a
    /// file exists there, else defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        let file = match Paths::discover() {
            Ok(paths) => paths.settings_file(),
            Err(_) => return Ok(Self::default()),
        };
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    /// Reject settings that would stall or never probe anything.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch size must be at least 1".into()));
        }
        if self.port_concurrency == 0 || self.host_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency limits must be at least 1".into(),
            ));
        }
        if self.connect_timeout_ms == 0 || self.banner_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.banner_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.port_concurrency, 500);
        assert_eq!(settings.host_concurrency, 100);
        assert_eq!(settings.batch_size, 100);
        assert_eq!(settings.connect_timeout(), Duration::from_millis(500));
        assert_eq!(settings.banner_timeout(), Duration::from_secs(1));
        assert_eq!((settings.start_port, settings.end_port), (1, 1024));
        tokio_test::assert_ok!(settings.validate());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"batch_size": 250, "skip_ping": true}}"#).unwrap();

        let settings = AppSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.batch_size, 250);
        assert!(settings.skip_ping);
        assert_eq!(settings.port_concurrency, 500);
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "batch_size = 3").unwrap();
        assert!(matches!(
            AppSettings::load_from(file.path()),
            Err(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppSettings::load(Some(&dir.path().join("absent.json")));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let settings = AppSettings {
            batch_size: 0,
            ..AppSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = AppSettings {
            connect_timeout_ms: 0,
            ..AppSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
