//! Output formatting module.
//!
//! Renders sweep outcomes to the console as a plain table or JSON, and
//! writes the CSV report file.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::{csv_path_for_host, sanitize_field, write_csv, write_host_csvs};
pub use json_format::print_json;
pub use plain::{print_error, print_outcome, print_report, print_scan_header, print_success};

use crate::cli::OutputFormat;
use crate::scanner::{HostSweepOutcome, NetworkSweepReport};
use std::io;

/// Print a single-host outcome in the requested format.
pub fn format_outcome(outcome: &HostSweepOutcome, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_outcome(outcome),
        OutputFormat::Json => json_format::print_json(outcome),
    }
}

/// Print a network report in the requested format.
pub fn format_report(report: &NetworkSweepReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_report(report),
        OutputFormat::Json => json_format::print_json(report),
    }
}
