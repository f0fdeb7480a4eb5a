//! Probe strategies and the port → strategy registration table.
//!
//! Every open port is probed with exactly one [`ProbeStrategy`]. The
//! [`PluginRegistry`] holds specialized strategies keyed by port, the set of
//! ports that must never be written to, and the generic fallback. New
//! protocols are added with [`PluginRegistry::register`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// How a strategy treats the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Speaks a known application protocol's opening move.
    Specialized,
    /// Never writes; only reads what the peer volunteers.
    PassiveOnly,
    /// Sends a bare line terminator to provoke a reply.
    Generic,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specialized => write!(f, "specialized"),
            Self::PassiveOnly => write!(f, "passive"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// A banner acquisition strategy for one kind of service.
pub trait ProbeStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn kind(&self) -> StrategyKind;

    /// Bytes to send when the peer stays silent after connecting.
    ///
    /// `None` means the socket is never written to.
    fn payload(&self, host: Ipv4Addr, port: u16) -> Option<Vec<u8>>;
}

/// `GET /` with a `Host` header naming the target.
#[derive(Debug, Default)]
pub struct HttpProbe;

impl ProbeStrategy for HttpProbe {
    fn name(&self) -> &str {
        "http"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Specialized
    }

    fn payload(&self, host: Ipv4Addr, _port: u16) -> Option<Vec<u8>> {
        Some(format!("GET / HTTP/1.1\r\nHost: {}\r\n\r\n", host).into_bytes())
    }
}

/// Read-only strategy for services that greet first (FTP, SSH, SMTP, ...).
#[derive(Debug, Default)]
pub struct PassiveProbe;

impl ProbeStrategy for PassiveProbe {
    fn name(&self) -> &str {
        "passive"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::PassiveOnly
    }

    fn payload(&self, _host: Ipv4Addr, _port: u16) -> Option<Vec<u8>> {
        None
    }
}

/// Fallback strategy: a bare `\r\n`.
#[derive(Debug, Default)]
pub struct GenericProbe;

impl ProbeStrategy for GenericProbe {
    fn name(&self) -> &str {
        "generic"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Generic
    }

    fn payload(&self, _host: Ipv4Addr, _port: u16) -> Option<Vec<u8>> {
        Some(b"\r\n".to_vec())
    }
}

/// Ports that get the HTTP request by default.
pub const HTTP_PORTS: &[u16] = &[80, 8080, 8443];

/// Ports whose servers greet unprompted and dislike early writes.
pub const PASSIVE_PORTS: &[u16] = &[21, 22, 25, 110, 143];

/// Port → strategy dispatch table.
pub struct PluginRegistry {
    specialized: HashMap<u16, Arc<dyn ProbeStrategy>>,
    passive_ports: HashSet<u16>,
    passive: Arc<dyn ProbeStrategy>,
    generic: Arc<dyn ProbeStrategy>,
}

impl PluginRegistry {
    /// An empty table: every port resolves to the generic strategy.
    pub fn new() -> Self {
        Self {
            specialized: HashMap::new(),
            passive_ports: HashSet::new(),
            passive: Arc::new(PassiveProbe),
            generic: Arc::new(GenericProbe),
        }
    }

    /// HTTP on [`HTTP_PORTS`], passive reads on [`PASSIVE_PORTS`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let http: Arc<dyn ProbeStrategy> = Arc::new(HttpProbe);
        for &port in HTTP_PORTS {
            registry.register(port, Arc::clone(&http));
        }
        for &port in PASSIVE_PORTS {
            registry.mark_passive(port);
        }
        registry
    }

    /// Register a specialized strategy for `port`, replacing any previous one.
    pub fn register(&mut self, port: u16, strategy: Arc<dyn ProbeStrategy>) {
        self.specialized.insert(port, strategy);
    }

    /// Classify `port` as passive-only when no specialized strategy exists.
    pub fn mark_passive(&mut self, port: u16) {
        self.passive_ports.insert(port);
    }

    /// Pick the strategy for `port`.
    ///
    /// Specialized registrations win, then the passive classification,
    /// then the generic fallback.
    pub fn resolve(&self, port: u16) -> Arc<dyn ProbeStrategy> {
        if let Some(strategy) = self.specialized.get(&port) {
            return Arc::clone(strategy);
        }
        if self.passive_ports.contains(&port) {
            return Arc::clone(&self.passive);
        }
        Arc::clone(&self.generic)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut specialized: Vec<_> = self.specialized.keys().copied().collect();
        specialized.sort_unstable();
        f.debug_struct("PluginRegistry")
            .field("specialized", &specialized)
            .field("passive_ports", &self.passive_ports.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RedisPing;

    impl ProbeStrategy for RedisPing {
        fn name(&self) -> &str {
            "redis"
        }

        fn kind(&self) -> StrategyKind {
            StrategyKind::Specialized
        }

        fn payload(&self, _host: Ipv4Addr, _port: u16) -> Option<Vec<u8>> {
            Some(b"PING\r\n".to_vec())
        }
    }

    #[test]
    fn test_default_dispatch() {
        let registry = PluginRegistry::with_defaults();
        assert_eq!(registry.resolve(80).kind(), StrategyKind::Specialized);
        assert_eq!(registry.resolve(8443).name(), "http");
        assert_eq!(registry.resolve(22).kind(), StrategyKind::PassiveOnly);
        assert_eq!(registry.resolve(110).kind(), StrategyKind::PassiveOnly);
        assert_eq!(registry.resolve(9999).kind(), StrategyKind::Generic);
    }

    #[test]
    fn test_empty_registry_is_generic() {
        let registry = PluginRegistry::new();
        assert_eq!(registry.resolve(80).kind(), StrategyKind::Generic);
        assert_eq!(registry.resolve(22).kind(), StrategyKind::Generic);
    }

    #[test]
    fn test_register_overrides_passive() {
        let mut registry = PluginRegistry::with_defaults();
        registry.register(6379, Arc::new(RedisPing));
        registry.register(25, Arc::new(RedisPing));
        assert_eq!(registry.resolve(6379).name(), "redis");
        assert_eq!(registry.resolve(25).name(), "redis");
    }

    #[test]
    fn test_payloads() {
        let host = Ipv4Addr::new(10, 0, 0, 5);
        assert_eq!(
            HttpProbe.payload(host, 80).unwrap(),
            b"GET / HTTP/1.1\r\nHost: 10.0.0.5\r\n\r\n".to_vec()
        );
        assert!(PassiveProbe.payload(host, 22).is_none());
        assert_eq!(GenericProbe.payload(host, 9).unwrap(), b"\r\n".to_vec());
    }
}
