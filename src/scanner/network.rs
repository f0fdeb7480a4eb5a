//! Multi-host sweep over the usable addresses of a CIDR block.
//!
//! Each host passes a liveness check before its port sweep is committed.
//! Host tasks run under the outer [`ConcurrencyGate`]; a failing host never
//! takes its siblings down with it.

use crate::error::{ScanError, ScanResult};
use crate::liveness::LivenessProbe;
use crate::scanner::gate::{ConcurrencyGate, DEFAULT_HOST_CONCURRENCY};
use crate::scanner::host::HostSweepEngine;
use crate::scanner::{HostFailure, HostSweepOutcome, NetworkSweepReport, SkipReason, SkippedHost};
use crate::types::PortRange;
use futures::stream::{FuturesUnordered, StreamExt};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

enum HostDisposition {
    Swept(HostSweepOutcome),
    Skipped(SkipReason),
}

/// Fans host sweeps out across a list of addresses.
pub struct NetworkSweepEngine {
    host_engine: Arc<HostSweepEngine>,
    liveness: Arc<dyn LivenessProbe>,
    host_concurrency: usize,
    cancel: CancellationToken,
}

impl NetworkSweepEngine {
    pub fn new(host_engine: Arc<HostSweepEngine>, liveness: Arc<dyn LivenessProbe>) -> Self {
        Self {
            host_engine,
            liveness,
            host_concurrency: DEFAULT_HOST_CONCURRENCY,
            cancel: CancellationToken::new(),
        }
    }

    /// Ceiling on simultaneous host sweeps.
    pub fn with_host_concurrency(mut self, limit: usize) -> Self {
        self.host_concurrency = limit.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sweep every host in `hosts` over `range`.
    pub async fn sweep(&self, hosts: Vec<Ipv4Addr>, range: PortRange) -> NetworkSweepReport {
        let gate = ConcurrencyGate::new(self.host_concurrency);
        self.sweep_with_gate(hosts, range, &gate).await
    }

    /// Sweep every host, admitting host tasks through `gate`.
    pub async fn sweep_with_gate(
        &self,
        hosts: Vec<Ipv4Addr>,
        range: PortRange,
        gate: &ConcurrencyGate,
    ) -> NetworkSweepReport {
        let started = Instant::now();
        let mut report = NetworkSweepReport::default();
        info!(hosts = hosts.len(), ports = %range, "network sweep started");

        let mut pending: FuturesUnordered<_> = hosts
            .into_iter()
            .map(|host| {
                let engine = Arc::clone(&self.host_engine);
                let liveness = Arc::clone(&self.liveness);
                let cancel = self.cancel.clone();
                let gate = gate.clone();
                let handle = tokio::spawn(async move {
                    let _permit = gate.acquire().await?;
                    sweep_host(&engine, liveness.as_ref(), &cancel, host, range).await
                });
                async move { (host, handle.await) }
            })
            .collect();

        while let Some((host, joined)) = pending.next().await {
            match joined {
                Ok(Ok(HostDisposition::Swept(outcome))) => report.outcomes.push(outcome),
                Ok(Ok(HostDisposition::Skipped(reason))) => {
                    info!(%host, %reason, "host skipped");
                    report.skipped.push(SkippedHost { host, reason });
                }
                Ok(Err(e)) => {
                    warn!(%host, error = %e, "host sweep failed");
                    report.failures.push(HostFailure {
                        host,
                        message: e.to_string(),
                    });
                }
                Err(join_err) => {
                    warn!(%host, error = %join_err, "host task failed");
                    report.failures.push(HostFailure {
                        host,
                        message: format!("host task failed: {}", join_err),
                    });
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            swept = report.outcomes.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "network sweep finished"
        );
        report
    }
}

async fn sweep_host(
    engine: &HostSweepEngine,
    liveness: &dyn LivenessProbe,
    cancel: &CancellationToken,
    host: Ipv4Addr,
    range: PortRange,
) -> ScanResult<HostDisposition> {
    if cancel.is_cancelled() {
        return Ok(HostDisposition::Skipped(SkipReason::Cancelled));
    }

    match liveness.is_alive(host).await {
        Ok(true) => {}
        Ok(false) => return Ok(HostDisposition::Skipped(SkipReason::NotAlive)),
        Err(ScanError::Liveness(message)) => {
            return Ok(HostDisposition::Skipped(SkipReason::LivenessFailed(message)))
        }
        Err(e) => return Err(e),
    }
    debug!(%host, "host alive");

    Ok(HostDisposition::Swept(engine.sweep(host, range).await))
}
