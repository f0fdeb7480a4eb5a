//! Configuration management for portsweep.
//!
//! Provides the settings file layer that sits under the command-line flags.

mod settings;

pub use settings::{AppSettings, Paths};
