//! Scanner module - the concurrent sweep engines.
//!
//! [`TcpProber`] handles one port. [`HostSweepEngine`] walks a port range
//! on one host in gated batches, and [`NetworkSweepEngine`] fans host sweeps
//! out over a CIDR block after a liveness check. Outcomes are plain data
//! handed to the output layer.

pub mod gate;
pub mod host;
pub mod network;
pub mod tcp;
pub mod traits;

use crate::types::PortRange;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

pub use gate::{ConcurrencyGate, GatePermit};
pub use host::HostSweepEngine;
pub use network::NetworkSweepEngine;
pub use tcp::TcpProber;
pub use traits::{OpenPort, ProbeFailure, ProbeResult, Prober};

/// Lifecycle of one host sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "reason")]
pub enum SweepState {
    Idle,
    Running,
    Completed,
    /// Stopped at a batch boundary on request.
    Cancelled,
    /// Aborted by a fault outside per-port isolation.
    Failed(String),
}

impl SweepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed(_))
    }
}

impl fmt::Display for SweepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Everything one host sweep produced.
///
/// `open` and `errors` are in completion order, not port order.
#[derive(Debug, Clone, Serialize)]
pub struct HostSweepOutcome {
    pub host: Ipv4Addr,
    pub ports: PortRange,
    pub state: SweepState,
    pub started_at: DateTime<Utc>,
    /// Ports whose probe finished, whatever the result.
    pub ports_scanned: usize,
    pub open: Vec<OpenPort>,
    pub errors: Vec<ProbeFailure>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl HostSweepOutcome {
    /// An empty outcome in the `Idle` state.
    pub fn new(host: Ipv4Addr, ports: PortRange) -> Self {
        Self {
            host,
            ports,
            state: SweepState::Idle,
            started_at: Utc::now(),
            ports_scanned: 0,
            open: Vec::new(),
            errors: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Open ports sorted by port number, for display.
    pub fn open_by_port(&self) -> Vec<&OpenPort> {
        let mut open: Vec<&OpenPort> = self.open.iter().collect();
        open.sort_by_key(|o| o.port);
        open
    }
}

/// Why a host in a network sweep was not swept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum SkipReason {
    /// The liveness probe got no reply.
    NotAlive,
    /// The liveness probe itself could not run.
    LivenessFailed(String),
    /// Cancellation was requested before the host started.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAlive => write!(f, "host is not alive"),
            Self::LivenessFailed(message) => write!(f, "liveness check failed: {}", message),
            Self::Cancelled => write!(f, "scan cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedHost {
    pub host: Ipv4Addr,
    pub reason: SkipReason,
}

/// A host whose sweep could not produce an outcome at all.
#[derive(Debug, Clone, Serialize)]
pub struct HostFailure {
    pub host: Ipv4Addr,
    pub message: String,
}

/// Aggregate result of a network sweep, in completion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkSweepReport {
    pub outcomes: Vec<HostSweepOutcome>,
    pub skipped: Vec<SkippedHost>,
    pub failures: Vec<HostFailure>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
