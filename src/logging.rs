//! Structured logging setup.
//!
//! Diagnostics go to stderr so stdout stays clean for tables and JSON.
//! `RUST_LOG` overrides the level picked from the command line.

use std::io;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Level from the verbosity flags. `quiet` wins over `verbose`.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        let level = if quiet {
            Level::WARN
        } else if verbose {
            Level::DEBUG
        } else {
            Level::INFO
        };
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Install the global subscriber. Returns an error if one is already set.
pub fn init_logging_with_config(config: &LogConfig) -> anyhow::Result<()> {
    let filter = create_env_filter(config.level);
    let registry = Registry::default().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr).with_target(true))
            .try_init()?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(io::stderr).with_target(false))
            .try_init()?,
    }
    Ok(())
}

fn create_env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_flags() {
        assert_eq!(LogConfig::from_flags(false, false).level, Level::INFO);
        assert_eq!(LogConfig::from_flags(true, false).level, Level::DEBUG);
        assert_eq!(LogConfig::from_flags(true, true).level, Level::WARN);
    }

    #[test]
    fn test_json_format() {
        let config = LogConfig::default().with_format(LogFormat::Json);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, Level::INFO);
    }
}
