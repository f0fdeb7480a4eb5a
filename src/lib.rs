//! # portsweep - a concurrent TCP port scanner
//!
//! portsweep probes a contiguous port range on one host, or on every usable
//! address of an IPv4 CIDR block, with TCP connect attempts.
//!
//! ## Features
//!
//! - **Bounded concurrency**: ports launch in batches through a semaphore gate
//! - **Banner grabbing**: per-port probe strategies, markup stripped, 80 chars max
//! - **Service attribution**: IANA-style CSV table or a built-in fallback
//! - **Network sweeps**: ping-gated host fan-out with its own concurrency ceiling
//! - **Fault isolation**: a failing port or host never aborts its siblings
//! - **Output**: console table or JSON, plus a CSV report file
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portsweep::plugins::PluginRegistry;
//! use portsweep::scanner::{HostSweepEngine, TcpProber};
//! use portsweep::services::ServiceCatalog;
//! use portsweep::types::PortRange;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let prober = TcpProber::new(
//!         Arc::new(ServiceCatalog::builtin()),
//!         Arc::new(PluginRegistry::with_defaults()),
//!     );
//!     let engine = HostSweepEngine::new(Arc::new(prober));
//!     let range = PortRange::from_bounds(1, 1024).unwrap();
//!
//!     let outcome = engine.sweep("127.0.0.1".parse().unwrap(), range).await;
//!     for open in outcome.open_by_port() {
//!         println!("{} {} {}", open.port, open.service, open.banner);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Port, range and target newtypes
//! - [`services`] - Port to service-name catalog
//! - [`plugins`] - Per-port banner probe strategies
//! - [`banner`] - Banner capture and cleansing
//! - [`scanner`] - Prober, concurrency gate and the sweep engines
//! - [`liveness`] - Ping check ahead of network sweeps
//! - [`config`] - Settings file layer
//! - [`output`] - Console and CSV rendering
//! - [`error`] - Error types

pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod liveness;
pub mod logging;
pub mod output;
pub mod plugins;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ScanError};
pub use scanner::{
    HostSweepEngine, HostSweepOutcome, NetworkSweepEngine, NetworkSweepReport, ProbeResult,
    Prober, SweepState, TcpProber,
};
pub use types::{Port, PortRange, ScanTarget, TargetSpec};
