//! TCP connect prober.
//!
//! Completes the full handshake with the operating system's socket API,
//! grabs a banner using the strategy registered for the port, and
//! attributes a service name from the catalog.

use crate::banner::{finalize_banner, grab_banner, BANNER_TIMEOUT};
use crate::plugins::PluginRegistry;
use crate::scanner::traits::{OpenPort, ProbeResult, Prober};
use crate::services::ServiceCatalog;
use crate::types::Port;
use async_trait::async_trait;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Default connect timeout per port.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// TCP connect prober.
///
/// Does not require elevated privileges.
pub struct TcpProber {
    catalog: Arc<ServiceCatalog>,
    registry: Arc<PluginRegistry>,
    connect_timeout: Duration,
    banner_timeout: Duration,
}

impl TcpProber {
    /// Create a prober with the default connect and banner timeouts.
    pub fn new(catalog: Arc<ServiceCatalog>, registry: Arc<PluginRegistry>) -> Self {
        Self {
            catalog,
            registry,
            connect_timeout: CONNECT_TIMEOUT,
            banner_timeout: BANNER_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_banner_timeout(mut self, timeout: Duration) -> Self {
        self.banner_timeout = timeout;
        self
    }

    /// Attempt to connect, mapping expected failures to `Ok(None)`.
    async fn attempt_connect(&self, addr: SocketAddr) -> io::Result<Option<TcpStream>> {
        match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(Some(stream)),
            Ok(Err(e)) if is_connectivity_failure(&e) => {
                trace!(%addr, error = %e, "closed");
                Ok(None)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                trace!(%addr, "connect timed out");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, host: Ipv4Addr, port: Port) -> ProbeResult {
        let port_num = port.as_u16();
        let addr = SocketAddr::V4(SocketAddrV4::new(host, port_num));

        let mut stream = match self.attempt_connect(addr).await {
            Ok(Some(stream)) => stream,
            Ok(None) => return ProbeResult::Closed(port),
            Err(e) => {
                warn!(%addr, error = %e, "unexpected connect failure");
                return ProbeResult::error(port, format!("connect failed: {}", e));
            }
        };

        let strategy = self.registry.resolve(port_num);
        let raw = grab_banner(
            &mut stream,
            strategy.as_ref(),
            host,
            port_num,
            self.banner_timeout,
        )
        .await;
        if raw.is_none() {
            debug!(
                %addr,
                strategy = strategy.name(),
                kind = %strategy.kind(),
                "open port gave no banner"
            );
        }

        // Best effort; the stream is dropped right after either way
        let _ = stream.shutdown().await;
        drop(stream);

        let banner = finalize_banner(raw.as_deref());
        let service = self.catalog.lookup(port_num);
        debug!(%addr, service, "open");

        ProbeResult::Open(OpenPort::new(port, service, banner))
    }
}

/// Connect errors that simply mean "nothing reachable is listening".
fn is_connectivity_failure(err: &io::Error) -> bool {
    use io::ErrorKind::*;

    if matches!(
        err.kind(),
        ConnectionRefused
            | ConnectionReset
            | ConnectionAborted
            | TimedOut
            | NotConnected
            | AddrNotAvailable
            | BrokenPipe
            | UnexpectedEof
            | Interrupted
    ) {
        return true;
    }

    if err
        .raw_os_error()
        .is_some_and(|code| UNREACHABLE_OS_ERRORS.contains(&code))
    {
        return true;
    }

    let message = err.to_string().to_lowercase();
    message.contains("unreachable") || message.contains("refused")
}

/// Host or network unreachable or down, by OS error code.
#[cfg(unix)]
const UNREACHABLE_OS_ERRORS: &[i32] = &[
    libc::EHOSTUNREACH,
    libc::EHOSTDOWN,
    libc::ENETUNREACH,
    libc::ENETDOWN,
];

/// WSAEHOSTUNREACH, WSAEHOSTDOWN, WSAENETUNREACH, WSAENETDOWN.
#[cfg(windows)]
const UNREACHABLE_OS_ERRORS: &[i32] = &[10065, 10064, 10051, 10050];

#[cfg(not(any(unix, windows)))]
const UNREACHABLE_OS_ERRORS: &[i32] = &[];
