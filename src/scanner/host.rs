//! Single-host sweep over a port range.
//!
//! Ports are walked in ascending batches. Each batch launches one task per
//! port under the per-host [`ConcurrencyGate`] and is awaited in full before
//! the next one starts. Cancellation is only observed between batches, so
//! probes already in flight always finish or time out on their own.

use crate::error::{ScanError, ScanResult};
use crate::scanner::gate::{ConcurrencyGate, DEFAULT_PORT_CONCURRENCY};
use crate::scanner::traits::{ProbeResult, Prober};
use crate::scanner::{HostSweepOutcome, SweepState};
use crate::types::{Port, PortRange};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of ports launched together.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Drives a [`Prober`] across every port of one host.
pub struct HostSweepEngine {
    prober: Arc<dyn Prober>,
    port_concurrency: usize,
    batch_size: usize,
    cancel: CancellationToken,
    show_progress: bool,
}

impl HostSweepEngine {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            port_concurrency: DEFAULT_PORT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            cancel: CancellationToken::new(),
            show_progress: false,
        }
    }

    /// Ceiling on simultaneous probes against one host.
    pub fn with_port_concurrency(mut self, limit: usize) -> Self {
        self.port_concurrency = limit.max(1);
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Draw a progress bar on stderr while sweeping.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Sweep `range` on `host` with a fresh per-host gate.
    pub async fn sweep(&self, host: Ipv4Addr, range: PortRange) -> HostSweepOutcome {
        let gate = ConcurrencyGate::new(self.port_concurrency);
        self.sweep_with_gate(host, range, &gate).await
    }

    /// Sweep `range` on `host`, admitting probes through `gate`.
    pub async fn sweep_with_gate(
        &self,
        host: Ipv4Addr,
        range: PortRange,
        gate: &ConcurrencyGate,
    ) -> HostSweepOutcome {
        let mut outcome = HostSweepOutcome::new(host, range);
        let started = Instant::now();
        let progress = self.progress_bar(range.len());

        outcome.state = SweepState::Running;
        info!(%host, ports = %range, batch_size = self.batch_size, "sweep started");

        let ports: Vec<Port> = range.iter().collect();
        for batch in ports.chunks(self.batch_size) {
            if self.cancel.is_cancelled() {
                info!(%host, scanned = outcome.ports_scanned, "sweep cancelled");
                outcome.state = SweepState::Cancelled;
                break;
            }

            if let Err(e) = self
                .run_batch(host, batch, gate, &mut outcome, progress.as_ref())
                .await
            {
                warn!(%host, error = %e, "sweep aborted");
                outcome.state = SweepState::Failed(e.to_string());
                break;
            }
        }

        if !outcome.state.is_terminal() {
            outcome.state = SweepState::Completed;
        }
        outcome.elapsed = started.elapsed();

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        info!(
            %host,
            state = %outcome.state,
            open = outcome.open.len(),
            errors = outcome.errors.len(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "sweep finished"
        );

        outcome
    }

    /// Launch one batch and wait for every probe in it.
    ///
    /// Returns an error only for faults outside per-port isolation; results
    /// gathered before that are still recorded.
    async fn run_batch(
        &self,
        host: Ipv4Addr,
        batch: &[Port],
        gate: &ConcurrencyGate,
        outcome: &mut HostSweepOutcome,
        progress: Option<&ProgressBar>,
    ) -> ScanResult<()> {
        debug!(
            %host,
            first = %batch[0],
            last = %batch[batch.len() - 1],
            "launching batch"
        );

        let mut pending: FuturesUnordered<_> = batch
            .iter()
            .map(|&port| {
                let prober = Arc::clone(&self.prober);
                let gate = gate.clone();
                let handle = tokio::spawn(async move {
                    let _permit = gate.acquire().await?;
                    Ok::<_, ScanError>(prober.probe(host, port).await)
                });
                async move { (port, handle.await) }
            })
            .collect();

        let mut fatal = None;
        while let Some((port, joined)) = pending.next().await {
            match joined {
                Ok(Ok(result)) => outcome.record(result),
                Ok(Err(e)) => {
                    fatal.get_or_insert(e);
                }
                Err(join_err) => outcome.record(ProbeResult::error(
                    port,
                    format!("probe task failed: {}", join_err),
                )),
            }
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
        ) {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    }
}

impl HostSweepOutcome {
    /// Append one probe result. `Closed` only bumps the scanned count.
    pub(crate) fn record(&mut self, result: ProbeResult) {
        self.ports_scanned += 1;
        match result {
            ProbeResult::Open(open) => self.open.push(open),
            ProbeResult::Closed(_) => {}
            ProbeResult::Error(failure) => {
                warn!(host = %self.host, %failure, "probe error");
                self.errors.push(failure);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::OpenPort;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Deterministic prober: fixed open ports, optional panic port.
    #[derive(Default)]
    struct MockProber {
        open: HashMap<u16, (&'static str, &'static str)>,
        panic_on: Option<u16>,
        delay: Duration,
        calls: Mutex<Vec<u16>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        cancel_after: Option<(u16, CancellationToken)>,
    }

    #[async_trait]
    impl Prober for MockProber {
        async fn probe(&self, _host: Ipv4Addr, port: Port) -> ProbeResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(port.as_u16());

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some((trigger, token)) = &self.cancel_after {
                if port.as_u16() == *trigger {
                    token.cancel();
                }
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic_on == Some(port.as_u16()) {
                panic!("decoder fault on port {}", port);
            }
            match self.open.get(&port.as_u16()) {
                Some((service, banner)) => {
                    ProbeResult::Open(OpenPort::new(port, *service, *banner))
                }
                None => ProbeResult::Closed(port),
            }
        }
    }

    fn fixed_open() -> HashMap<u16, (&'static str, &'static str)> {
        HashMap::from([
            (22, ("ssh", "SSH-2.0-OpenSSH_9.6")),
            (80, ("http", "HTTP/1.1 200 OK")),
            (150, ("Unknown Service", "No banner")),
        ])
    }

    fn range(start: u32, end: u32) -> PortRange {
        PortRange::from_bounds(start, end).unwrap()
    }

    fn triples(outcome: &HostSweepOutcome) -> Vec<(u16, String, String)> {
        let mut t: Vec<_> = outcome
            .open
            .iter()
            .map(|o| (o.port.as_u16(), o.service.clone(), o.banner.clone()))
            .collect();
        t.sort();
        t
    }

    #[tokio::test]
    async fn test_every_port_probed_once() {
        let prober = Arc::new(MockProber {
            open: fixed_open(),
            ..Default::default()
        });
        let engine = HostSweepEngine::new(prober.clone()).with_batch_size(64);
        let outcome = engine.sweep(Ipv4Addr::LOCALHOST, range(1, 250)).await;

        assert_eq!(outcome.state, SweepState::Completed);
        assert_eq!(outcome.ports_scanned, 250);

        let mut calls = prober.calls.lock().unwrap().clone();
        calls.sort_unstable();
        assert_eq!(calls, (1..=250).collect::<Vec<u16>>());

        let open: Vec<u16> = triples(&outcome).iter().map(|t| t.0).collect();
        assert_eq!(open, vec![22, 80, 150]);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_batches_run_in_ascending_order() {
        let prober = Arc::new(MockProber::default());
        let engine = HostSweepEngine::new(prober.clone()).with_batch_size(10);
        engine.sweep(Ipv4Addr::LOCALHOST, range(1, 35)).await;

        let calls = prober.calls.lock().unwrap().clone();
        for (i, chunk) in calls.chunks(10).enumerate() {
            let lo = (i * 10 + 1) as u16;
            assert!(chunk.iter().all(|&p| p >= lo && p < lo + 10));
        }
    }

    #[tokio::test]
    async fn test_repeat_sweeps_are_identical() {
        let prober = Arc::new(MockProber {
            open: fixed_open(),
            delay: Duration::from_millis(1),
            ..Default::default()
        });
        let engine = HostSweepEngine::new(prober).with_batch_size(50);
        let first = engine.sweep(Ipv4Addr::LOCALHOST, range(1, 200)).await;
        let second = engine.sweep(Ipv4Addr::LOCALHOST, range(1, 200)).await;
        assert_eq!(triples(&first), triples(&second));
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let prober = Arc::new(MockProber {
            delay: Duration::from_millis(5),
            ..Default::default()
        });
        let engine = HostSweepEngine::new(prober.clone())
            .with_batch_size(100)
            .with_port_concurrency(8);
        let gate = ConcurrencyGate::new(8);
        let outcome = engine
            .sweep_with_gate(Ipv4Addr::LOCALHOST, range(1, 300), &gate)
            .await;

        assert_eq!(outcome.ports_scanned, 300);
        assert!(prober.peak.load(Ordering::SeqCst) <= 8);
        assert!(gate.peak() <= 8);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_faulting_port_is_isolated() {
        let prober = Arc::new(MockProber {
            open: fixed_open(),
            panic_on: Some(23),
            ..Default::default()
        });
        let engine = HostSweepEngine::new(prober).with_batch_size(100);
        let outcome = engine.sweep(Ipv4Addr::LOCALHOST, range(1, 100)).await;

        assert_eq!(outcome.state, SweepState::Completed);
        assert_eq!(outcome.ports_scanned, 100);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].port.as_u16(), 23);
        assert_eq!(
            triples(&outcome).iter().map(|t| t.0).collect::<Vec<_>>(),
            vec![22, 80]
        );
    }

    #[tokio::test]
    async fn test_cancellation_at_batch_boundary() {
        let token = CancellationToken::new();
        let prober = Arc::new(MockProber {
            cancel_after: Some((3, token.clone())),
            ..Default::default()
        });
        let engine = HostSweepEngine::new(prober)
            .with_batch_size(10)
            .with_cancellation(token);
        let outcome = engine.sweep(Ipv4Addr::LOCALHOST, range(1, 50)).await;

        // The batch holding port 3 runs to completion, nothing after it
        assert_eq!(outcome.state, SweepState::Cancelled);
        assert_eq!(outcome.ports_scanned, 10);
    }

    #[tokio::test]
    async fn test_closed_gate_fails_sweep() {
        let prober = Arc::new(MockProber::default());
        let engine = HostSweepEngine::new(prober.clone());
        let gate = ConcurrencyGate::new(4);
        gate.close();

        let outcome = engine
            .sweep_with_gate(Ipv4Addr::LOCALHOST, range(1, 500), &gate)
            .await;

        assert!(matches!(outcome.state, SweepState::Failed(_)));
        assert_eq!(outcome.ports_scanned, 0);
        assert!(prober.calls.lock().unwrap().is_empty());
    }
}
