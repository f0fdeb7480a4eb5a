//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::scanner::{HostSweepOutcome, NetworkSweepReport, SweepState};
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

/// Print one host's results in human-readable plain text format.
pub fn print_outcome(outcome: &HostSweepOutcome) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_outcome(&mut out, outcome)
}

/// Print every swept host, then the hosts that were skipped or failed.
pub fn print_report(report: &NetworkSweepReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut outcomes: Vec<&HostSweepOutcome> = report.outcomes.iter().collect();
    outcomes.sort_by_key(|o| o.host);
    for outcome in outcomes {
        write_outcome(&mut out, outcome)?;
    }

    if !report.skipped.is_empty() {
        writeln!(out, "  {}", style("Skipped hosts:").yellow().bold())?;
        for skipped in &report.skipped {
            writeln!(out, "    {:<15}  {}", skipped.host, style(&skipped.reason).dim())?;
        }
        writeln!(out)?;
    }

    if !report.failures.is_empty() {
        writeln!(out, "  {}", style("Failed hosts:").red().bold())?;
        for failure in &report.failures {
            writeln!(out, "    {:<15}  {}", failure.host, failure.message)?;
        }
        writeln!(out)?;
    }

    writeln!(
        out,
        "  {} {} swept, {} skipped, {} failed in {:.2}s",
        style("Network:").bold(),
        style(report.outcomes.len()).green().bold(),
        style(report.skipped.len()).yellow(),
        style(report.failures.len()).red(),
        report.elapsed.as_secs_f64()
    )?;
    writeln!(out)?;
    Ok(())
}

fn write_outcome(out: &mut impl Write, outcome: &HostSweepOutcome) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "  {} {}",
        style("Host:").bold(),
        style(outcome.host).white().bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;

    let state_style = match outcome.state {
        SweepState::Completed => Style::new().green(),
        SweepState::Cancelled => Style::new().yellow(),
        _ => Style::new().red(),
    };
    writeln!(
        out,
        "  {} {} of {} ports scanned in {:.2}s ({})",
        style("Statistics:").bold(),
        outcome.ports_scanned,
        outcome.ports.len(),
        outcome.elapsed.as_secs_f64(),
        state_style.apply_to(&outcome.state)
    )?;
    writeln!(
        out,
        "               {} open, {} errors",
        style(outcome.open.len()).green().bold(),
        style(outcome.errors.len()).red()
    )?;
    writeln!(out)?;

    if outcome.open.is_empty() {
        writeln!(out, "  {}", style("No open ports found.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:>6}  {:<20}  {:<6}  {}",
            style("PORT").bold(),
            style("SERVICE").bold(),
            style("STATUS").bold(),
            style("BANNER").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for open in outcome.open_by_port() {
            writeln!(
                out,
                "  {:>6}  {:<20}  {:<6}  {}",
                open.port,
                open.service,
                style(open.status()).green().bold(),
                style(&open.banner).dim()
            )?;
        }
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
    }

    if !outcome.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {}", style("Probe errors:").red().bold())?;
        let mut errors: Vec<_> = outcome.errors.iter().collect();
        errors.sort_by_key(|e| e.port);
        for error in errors {
            writeln!(out, "  {:>6}  {}", error.port, error.message)?;
        }
    }

    writeln!(out)?;
    Ok(())
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(target: &str, hosts: usize, ports: usize) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portsweep").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{} Target: {}", style("•").dim(), style(target).white().bold());
    if hosts > 1 {
        println!("{} Hosts: {}", style("•").dim(), style(hosts).white().bold());
    }
    println!(
        "{} Scanning {} ports...",
        style("•").dim(),
        style(ports).white().bold()
    );
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{OpenPort, ProbeFailure};
    use crate::types::{Port, PortRange};
    use std::net::Ipv4Addr;

    fn render(outcome: &HostSweepOutcome) -> String {
        console::set_colors_enabled(false);
        let mut buf = Vec::new();
        write_outcome(&mut buf, outcome).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_table_sorted_by_port() {
        let range = PortRange::from_bounds(1, 100).unwrap();
        let mut outcome = HostSweepOutcome::new(Ipv4Addr::LOCALHOST, range);
        outcome.state = SweepState::Completed;
        outcome
            .open
            .push(OpenPort::new(Port::new(80).unwrap(), "http", "nginx"));
        outcome
            .open
            .push(OpenPort::new(Port::new(22).unwrap(), "ssh", "No banner"));

        let text = render(&outcome);
        let ssh = text.find("ssh").unwrap();
        let http = text.find("http").unwrap();
        assert!(ssh < http);
        assert!(text.contains("PORT"));
        assert!(text.contains("completed"));
    }

    #[test]
    fn test_errors_listed() {
        let range = PortRange::from_bounds(1, 10).unwrap();
        let mut outcome = HostSweepOutcome::new(Ipv4Addr::LOCALHOST, range);
        outcome.errors.push(ProbeFailure {
            port: Port::new(7).unwrap(),
            message: "too many open files".into(),
        });

        let text = render(&outcome);
        assert!(text.contains("No open ports found."));
        assert!(text.contains("too many open files"));
    }
}
