//! Bounded admission control for probes and host sweeps.
//!
//! A [`ConcurrencyGate`] is a counting semaphore that also tracks how many
//! holders are in flight and the highest count seen, so ceilings can be
//! observed in logs and tests.

use crate::error::{ScanError, ScanResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default ceiling for simultaneous port probes against one host.
pub const DEFAULT_PORT_CONCURRENCY: usize = 500;

/// Default ceiling for simultaneous host sweeps in a network sweep.
pub const DEFAULT_HOST_CONCURRENCY: usize = 100;

#[derive(Debug, Default)]
struct GateStats {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// A cloneable handle to a shared semaphore. Clones share the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    stats: Arc<GateStats>,
    limit: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `limit` holders at once.
    ///
    /// The limit is clamped to at least one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            stats: Arc::new(GateStats::default()),
            limit,
        }
    }

    /// Wait for a free slot.
    ///
    /// The slot is returned when the permit is dropped, whatever the task
    /// outcome. Fails only once the gate has been closed.
    pub async fn acquire(&self) -> ScanResult<GatePermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ScanError::GateClosed)?;

        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);

        Ok(GatePermit {
            _permit: permit,
            stats: Arc::clone(&self.stats),
        })
    }

    /// Refuse all further acquisitions. Existing permits stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous holders observed so far.
    pub fn peak(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }
}

/// RAII slot in a [`ConcurrencyGate`].
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    stats: Arc<GateStats>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit field is released
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let gate = ConcurrencyGate::new(2);
        let a = gate.acquire().await.unwrap();
        let _b = gate.acquire().await.unwrap();
        assert_eq!(gate.in_flight(), 2);
        drop(a);
        assert_eq!(gate.in_flight(), 1);
        assert_eq!(gate.peak(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_clamped() {
        let gate = ConcurrencyGate::new(0);
        assert_eq!(gate.limit(), 1);
        tokio_test::assert_ok!(gate.acquire().await);
    }

    #[tokio::test]
    async fn test_closed_gate_refuses() {
        let gate = ConcurrencyGate::new(4);
        gate.close();
        assert!(gate.is_closed());
        assert!(matches!(gate.acquire().await, Err(ScanError::GateClosed)));
    }

    #[tokio::test]
    async fn test_peak_never_exceeds_limit() {
        let gate = ConcurrencyGate::new(3);
        let mut handles = Vec::new();
        for _ in 0..20 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(gate.peak(), 3);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_release_on_panic() {
        let gate = ConcurrencyGate::new(1);
        let inner = gate.clone();
        let result = tokio::spawn(async move {
            let _permit = inner.acquire().await.unwrap();
            panic!("probe blew up");
        })
        .await;
        assert!(result.is_err());
        assert_eq!(gate.in_flight(), 0);
        tokio_test::assert_ok!(gate.acquire().await);
    }
}
