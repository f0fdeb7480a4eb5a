//! Port to service-name attribution.
//!
//! A [`ServiceCatalog`] is built once at startup, either from an IANA-style
//! CSV reference table or from the built-in table of well-known TCP
//! services, and is then only read.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Service name reported for ports the catalog does not know.
pub const UNKNOWN_SERVICE: &str = "Unknown Service";

/// Well-known TCP services used when no reference table is configured.
const WELL_KNOWN: &[(u16, &str)] = &[
    (20, "ftp-data"),
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (53, "domain"),
    (80, "http"),
    (88, "kerberos"),
    (110, "pop3"),
    (111, "sunrpc"),
    (119, "nntp"),
    (135, "msrpc"),
    (139, "netbios-ssn"),
    (143, "imap"),
    (179, "bgp"),
    (389, "ldap"),
    (443, "https"),
    (445, "microsoft-ds"),
    (465, "smtps"),
    (514, "shell"),
    (548, "afp"),
    (554, "rtsp"),
    (587, "submission"),
    (631, "ipp"),
    (636, "ldaps"),
    (873, "rsync"),
    (993, "imaps"),
    (995, "pop3s"),
    (1080, "socks"),
    (1433, "ms-sql-s"),
    (1521, "oracle"),
    (1723, "pptp"),
    (1883, "mqtt"),
    (2049, "nfs"),
    (2375, "docker"),
    (3128, "squid"),
    (3306, "mysql"),
    (3389, "ms-wbt-server"),
    (5432, "postgresql"),
    (5672, "amqp"),
    (5900, "vnc"),
    (6379, "redis"),
    (6443, "kubernetes-api"),
    (8000, "http-alt"),
    (8080, "http-alt"),
    (8443, "pcsync-https"),
    (9092, "kafka"),
    (9200, "elasticsearch"),
    (11211, "memcache"),
    (27017, "mongodb"),
];

/// Errors raised while loading a service reference table.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("service table not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read service table {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },
    #[error("service table has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("malformed service table header: {0}")]
    InvalidHeader(String),
}

/// Immutable port → service-name mapping.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    entries: HashMap<u16, String>,
}

impl ServiceCatalog {
    /// A catalog with no entries; every lookup yields [`UNKNOWN_SERVICE`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table of well-known TCP services.
    pub fn builtin() -> Self {
        let entries = WELL_KNOWN
            .iter()
            .map(|&(port, name)| (port, name.to_string()))
            .collect();
        Self { entries }
    }

    /// Load a reference table from a CSV file.
    ///
    /// A missing or unreadable file is an error; malformed rows are not.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CatalogError::NotFound(path.to_path_buf()),
            _ => CatalogError::ReadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;
        let catalog = Self::from_reader(file)?;
        debug!(path = %path.display(), entries = catalog.len(), "loaded service table");
        Ok(catalog)
    }

    /// Load a reference table with `Service Name`, `Port Number` and
    /// `Transport Protocol` columns (either capitalization).
    ///
    /// Only rows whose protocol mentions `tcp` are kept. A port cell may be a
    /// single number or an inclusive `lo-hi` range. Rows that fail to parse
    /// are skipped; later rows win over earlier ones for the same port.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, CatalogError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| CatalogError::InvalidHeader(e.to_string()))?
            .clone();
        let service_col = find_column(&headers, "Service Name")?;
        let port_col = find_column(&headers, "Port Number")?;
        let proto_col = find_column(&headers, "Transport Protocol")?;

        let mut catalog = Self::empty();
        for record in rdr.records() {
            let Ok(record) = record else {
                continue;
            };
            let service = record.get(service_col).unwrap_or_default();
            let ports = record.get(port_col).unwrap_or_default();
            let proto = record.get(proto_col).unwrap_or_default();

            if service.is_empty() || ports.is_empty() || !proto.to_lowercase().contains("tcp") {
                continue;
            }
            if let Some((lo, hi)) = parse_port_cell(ports) {
                for port in lo..=hi {
                    catalog.insert(port, service);
                }
            }
        }

        Ok(catalog)
    }

    /// Add or replace the entry for `port`.
    pub fn insert(&mut self, port: u16, service: impl Into<String>) {
        self.entries.insert(port, service.into());
    }

    /// Look up the service name for `port`.
    pub fn lookup(&self, port: u16) -> &str {
        self.entries
            .get(&port)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SERVICE)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn find_column(headers: &csv::StringRecord, name: &'static str) -> Result<usize, CatalogError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or(CatalogError::MissingColumn(name))
}

/// Parse `"80"` or `"6000-6063"` into an inclusive bound pair.
///
/// Reversed ranges are rejected. Port 0 is dropped on purpose: it can never
/// be in a sweep range, so an entry for it would never be looked up. A
/// `0-N` range keeps ports 1 through N.
fn parse_port_cell(cell: &str) -> Option<(u16, u16)> {
    let (lo, hi): (u16, u16) = match cell.split_once('-') {
        Some((lo, hi)) => (lo.trim().parse().ok()?, hi.trim().parse().ok()?),
        None => {
            let port = cell.parse().ok()?;
            (port, port)
        }
    };
    if lo > hi || hi == 0 {
        return None;
    }
    Some((lo.max(1), hi))
}
