//! Prober trait abstraction and per-port result types.
//!
//! Every probe call returns a [`ProbeResult`]; connection failures are an
//! ordinary `Closed` outcome rather than an error.

use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// An open port with its attributed service and cleansed banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPort {
    /// The port number that accepted the connection.
    pub port: Port,
    /// Service name from the catalog.
    pub service: String,
    /// Cleansed banner text, or the `No banner` sentinel.
    pub banner: String,
}

impl OpenPort {
    pub fn new(port: Port, service: impl Into<String>, banner: impl Into<String>) -> Self {
        Self {
            port,
            service: service.into(),
            banner: banner.into(),
        }
    }

    /// Status column value for reports.
    pub fn status(&self) -> &'static str {
        "Open"
    }
}

/// A fault outside the expected connectivity failures, isolated to one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub port: Port,
    pub message: String,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port {}: {}", self.port, self.message)
    }
}

/// Outcome of probing a single port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// Connection succeeded.
    Open(OpenPort),
    /// Refused, timed out, reset or unreachable.
    Closed(Port),
    /// Unexpected fault.
    Error(ProbeFailure),
}

impl ProbeResult {
    pub fn error(port: Port, message: impl Into<String>) -> Self {
        Self::Error(ProbeFailure {
            port,
            message: message.into(),
        })
    }

    pub fn port(&self) -> Port {
        match self {
            Self::Open(open) => open.port,
            Self::Closed(port) => *port,
            Self::Error(failure) => failure.port,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }
}

/// Trait for single-port probe implementations.
///
/// The sweep engines only see this trait, so tests can substitute
/// deterministic probers for real sockets.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe one port on `host`. Must not panic on network errors.
    async fn probe(&self, host: Ipv4Addr, port: Port) -> ProbeResult;
}
