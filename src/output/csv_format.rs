//! CSV report files.
//!
//! One row per open port under a fixed `Port,Service,Status,Banner` header.
//! Fields are never quoted, so commas and line breaks are rewritten first.

use crate::error::{CliError, CliResult};
use crate::scanner::HostSweepOutcome;
use std::fs::File;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::warn;

const HEADER: [&str; 4] = ["Port", "Service", "Status", "Banner"];

/// Replace `,` with `;` and line breaks with spaces.
pub fn sanitize_field(field: &str) -> String {
    field
        .chars()
        .map(|c| match c {
            ',' => ';',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// `out.csv` becomes `out_10.0.0.5.csv` for per-host reports of a network sweep.
pub fn csv_path_for_host(path: &Path, host: Ipv4Addr) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, host, ext.to_string_lossy()),
        None => format!("{}_{}", stem, host),
    };
    path.with_file_name(name)
}

/// Write the open ports of `outcome` to `path`, sorted by port.
///
/// The parent directory must already exist.
pub fn write_csv(path: &Path, outcome: &HostSweepOutcome) -> CliResult<()> {
    let failed = |reason: String| CliError::OutputFailed {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::create(path).map_err(|e| failed(e.to_string()))?;
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(file);

    wtr.write_record(HEADER).map_err(|e| failed(e.to_string()))?;
    for open in outcome.open_by_port() {
        wtr.write_record([
            open.port.to_string(),
            sanitize_field(&open.service),
            open.status().to_string(),
            sanitize_field(&open.banner),
        ])
        .map_err(|e| failed(e.to_string()))?;
    }
    wtr.flush().map_err(|e| failed(e.to_string()))?;
    Ok(())
}

/// Write one report per host next to `path`.
///
/// A failed file does not stop the others. Returns the number written and
/// the failures.
pub fn write_host_csvs(path: &Path, outcomes: &[HostSweepOutcome]) -> (usize, Vec<CliError>) {
    let mut written = 0;
    let mut failures = Vec::new();
    for outcome in outcomes {
        let host_path = csv_path_for_host(path, outcome.host);
        match write_csv(&host_path, outcome) {
            Ok(()) => written += 1,
            Err(e) => {
                warn!(host = %outcome.host, error = %e, "csv report not written");
                failures.push(e);
            }
        }
    }
    (written, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::OpenPort;
    use crate::types::{Port, PortRange};
    use std::fs;

    fn outcome() -> HostSweepOutcome {
        let range = PortRange::from_bounds(1, 100).unwrap();
        let mut outcome = HostSweepOutcome::new(Ipv4Addr::LOCALHOST, range);
        outcome.open.push(OpenPort::new(
            Port::new(80).unwrap(),
            "http",
            "HTTP/1.1 200 OK\r\nServer: a,b",
        ));
        outcome
            .open
            .push(OpenPort::new(Port::new(22).unwrap(), "ssh", "SSH-2.0-OpenSSH_9.6"));
        outcome
    }

    #[test]
    fn test_sanitize_field() {
        assert_eq!(sanitize_field("a,b\nc\rd"), "a;b c d");
        assert_eq!(sanitize_field("plain"), "plain");
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &outcome()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Port,Service,Status,Banner",
                "22,ssh,Open,SSH-2.0-OpenSSH_9.6",
                "80,http,Open,HTTP/1.1 200 OK  Server: a;b",
            ]
        );
    }

    #[test]
    fn test_header_only_when_nothing_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let range = PortRange::from_bounds(1, 10).unwrap();
        write_csv(&path, &HostSweepOutcome::new(Ipv4Addr::LOCALHOST, range)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim_end(), "Port,Service,Status,Banner");
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        assert!(matches!(
            write_csv(&path, &outcome()),
            Err(CliError::OutputFailed { .. })
        ));
    }

    #[test]
    fn test_one_unwritable_host_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let range = PortRange::from_bounds(1, 10).unwrap();
        let outcomes: Vec<HostSweepOutcome> = (1..=3)
            .map(|i| HostSweepOutcome::new(Ipv4Addr::new(10, 0, 0, i), range))
            .collect();

        // A directory where the first host's file should go
        fs::create_dir(dir.path().join("out_10.0.0.1.csv")).unwrap();

        let (written, failures) = write_host_csvs(&path, &outcomes);
        assert_eq!(written, 2);
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], CliError::OutputFailed { .. }));
        assert!(dir.path().join("out_10.0.0.2.csv").is_file());
        assert!(dir.path().join("out_10.0.0.3.csv").is_file());
    }

    #[test]
    fn test_csv_path_for_host() {
        let host = Ipv4Addr::new(10, 0, 0, 5);
        assert_eq!(
            csv_path_for_host(Path::new("/tmp/out.csv"), host),
            PathBuf::from("/tmp/out_10.0.0.5.csv")
        );
        assert_eq!(
            csv_path_for_host(Path::new("report"), host),
            PathBuf::from("report_10.0.0.5")
        );
    }
}
