//! Host liveness checks run before a host is swept.
//!
//! The default check shells out to the platform `ping` with a single echo
//! request. It is pass/fail only and plays no part in port probing.

use crate::error::{ScanError, ScanResult};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::trace;

/// Default wait for one echo reply.
pub const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// Trait for reachability checks.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// `Ok(false)` for an unreachable host; `Err` when the check itself
    /// could not run.
    async fn is_alive(&self, host: Ipv4Addr) -> ScanResult<bool>;
}

/// ICMP echo via the system `ping` binary.
#[derive(Debug, Clone)]
pub struct PingProbe {
    timeout: Duration,
}

impl PingProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(&self, host: Ipv4Addr) -> Command {
        let mut cmd = Command::new("ping");
        if cfg!(windows) {
            let millis = self.timeout.as_millis().to_string();
            cmd.args(["-n", "1", "-w", millis.as_str()]);
        } else {
            let secs = self.timeout.as_secs().max(1).to_string();
            cmd.args(["-c", "1", "-W", secs.as_str()]);
        }
        cmd.arg(host.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new(PING_TIMEOUT)
    }
}

#[async_trait]
impl LivenessProbe for PingProbe {
    async fn is_alive(&self, host: Ipv4Addr) -> ScanResult<bool> {
        let mut child = self
            .command(host)
            .spawn()
            .map_err(|e| ScanError::Liveness(format!("could not run ping: {}", e)))?;

        // Some ping builds ignore -W; bound the wait ourselves
        let deadline = self.timeout + Duration::from_secs(1);
        match timeout(deadline, child.wait()).await {
            Ok(Ok(status)) => {
                trace!(%host, alive = status.success(), "ping finished");
                Ok(status.success())
            }
            Ok(Err(e)) => Err(ScanError::Liveness(format!("ping failed: {}", e))),
            Err(_) => {
                trace!(%host, "ping timed out");
                Ok(false)
            }
        }
    }
}

/// Treats every host as alive, skipping the echo request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeAlive;

#[async_trait]
impl LivenessProbe for AssumeAlive {
    async fn is_alive(&self, _host: Ipv4Addr) -> ScanResult<bool> {
        Ok(true)
    }
}
