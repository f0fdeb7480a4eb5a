//! Target specification types with CIDR and hostname support.
//!
//! Accepted inputs:
//! - A single IPv4 address (192.168.1.1)
//! - An IPv4 CIDR block (192.168.1.0/24)
//! - A hostname (example.com), resolved to its first IPv4 address

use ipnetwork::Ipv4Network;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Error type for target parsing and resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target format: {0}")]
    InvalidFormat(String),
    #[error("IPv6 targets are not supported: {0}")]
    Ipv6Unsupported(String),
    #[error("failed to resolve hostname '{0}': {1}")]
    DnsResolutionFailed(String, String),
    #[error("no IPv4 addresses found for hostname '{0}'")]
    NoAddressesFound(String),
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("CIDR range too large: {0} addresses (max: {1})")]
    CidrTooLarge(u64, u64),
}

/// A target as typed by the user, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A single IPv4 address.
    Single(Ipv4Addr),
    /// A CIDR network range.
    Cidr(Ipv4Network),
    /// A hostname to be resolved.
    Hostname(String),
}

impl TargetSpec {
    /// Maximum number of addresses allowed in a CIDR range (/16).
    pub const MAX_CIDR_HOSTS: u64 = 65536;

    /// Parse a target specification from a string.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();

        if let Ok(ip) = s.parse::<IpAddr>() {
            return match ip {
                IpAddr::V4(v4) => Ok(Self::Single(v4)),
                IpAddr::V6(_) => Err(TargetError::Ipv6Unsupported(s.to_string())),
            };
        }

        if s.contains('/') {
            if s.contains(':') {
                return Err(TargetError::Ipv6Unsupported(s.to_string()));
            }
            let network: Ipv4Network = s
                .parse()
                .map_err(|_| TargetError::InvalidCidr(s.to_string()))?;

            let size = network_size(&network);
            if size > Self::MAX_CIDR_HOSTS {
                return Err(TargetError::CidrTooLarge(size, Self::MAX_CIDR_HOSTS));
            }

            return Ok(Self::Cidr(network));
        }

        if is_valid_hostname(s) {
            return Ok(Self::Hostname(s.to_string()));
        }

        Err(TargetError::InvalidFormat(s.to_string()))
    }

    /// Resolve this specification into something the engines can sweep.
    ///
    /// Hostnames are looked up through DNS; CIDR blocks stay unexpanded
    /// until [`ScanTarget::hosts`] is called.
    pub async fn resolve(&self) -> Result<ScanTarget, TargetError> {
        match self {
            Self::Single(ip) => Ok(ScanTarget::Host {
                original: ip.to_string(),
                ip: *ip,
            }),

            Self::Cidr(network) => Ok(ScanTarget::Network(*network)),

            Self::Hostname(hostname) => {
                let resolver =
                    TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

                let response = resolver.lookup_ip(hostname.as_str()).await.map_err(|e| {
                    TargetError::DnsResolutionFailed(hostname.clone(), e.to_string())
                })?;

                let ip = response
                    .iter()
                    .find_map(|ip| match ip {
                        IpAddr::V4(v4) => Some(v4),
                        IpAddr::V6(_) => None,
                    })
                    .ok_or_else(|| TargetError::NoAddressesFound(hostname.clone()))?;

                Ok(ScanTarget::Host {
                    original: hostname.clone(),
                    ip,
                })
            }
        }
    }
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Cidr(network) => write!(f, "{}", network),
            Self::Hostname(hostname) => write!(f, "{}", hostname),
        }
    }
}

/// A resolved target: one host, or a network to be swept host by host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    Host { original: String, ip: Ipv4Addr },
    Network(Ipv4Network),
}

impl ScanTarget {
    /// Usable host addresses covered by this target.
    ///
    /// Network and broadcast addresses are excluded for prefixes shorter
    /// than /31.
    pub fn hosts(&self) -> Vec<Ipv4Addr> {
        match self {
            Self::Host { ip, .. } => vec![*ip],
            Self::Network(network) => usable_hosts(network),
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host { original, ip } if *original == ip.to_string() => write!(f, "{}", ip),
            Self::Host { original, ip } => write!(f, "{} ({})", original, ip),
            Self::Network(network) => write!(f, "{}", network),
        }
    }
}

fn network_size(network: &Ipv4Network) -> u64 {
    1u64 << (32 - u32::from(network.prefix()))
}

fn usable_hosts(network: &Ipv4Network) -> Vec<Ipv4Addr> {
    if network.prefix() >= 31 {
        return network.iter().collect();
    }
    let network_addr = network.network();
    let broadcast = network.broadcast();
    network
        .iter()
        .filter(|addr| *addr != network_addr && *addr != broadcast)
        .collect()
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    // Each label must be 1-63 alphanumeric/hyphen characters, no edge hyphens
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && label.chars().last().is_some_and(|c| c.is_ascii_alphanumeric())
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
