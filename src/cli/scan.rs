//! Scan command implementation.
//!
//! Merges flags over the settings file, builds the sweep engines and renders
//! the results. Only configuration faults abort the run; everything else
//! ends up in the outcome.

use crate::cli::OutputFormat;
use crate::config::AppSettings;
use crate::error::CliResult;
use crate::liveness::{AssumeAlive, LivenessProbe, PingProbe};
use crate::output;
use crate::plugins::PluginRegistry;
use crate::scanner::{HostSweepEngine, NetworkSweepEngine, TcpProber};
use crate::services::ServiceCatalog;
use crate::types::{PortRange, ScanTarget, TargetSpec};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Scan a target for open TCP ports.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Target to scan (IP, hostname, or CIDR notation)
    ///
    /// Examples:
    ///   192.168.1.1        Single IP address
    ///   example.com        Hostname
    ///   192.168.1.0/24     CIDR range
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// First port of the range [default: 1]
    #[arg(long, value_name = "PORT")]
    pub start_port: Option<u32>,

    /// Last port of the range, inclusive [default: 1024]
    #[arg(long, value_name = "PORT")]
    pub end_port: Option<u32>,

    /// Service table in IANA CSV format
    #[arg(long, value_name = "CSV")]
    pub services: Option<PathBuf>,

    /// Connect timeout in milliseconds [default: 500]
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Banner read timeout in milliseconds [default: 1000]
    #[arg(long, value_name = "MS")]
    pub banner_timeout: Option<u64>,

    /// Ports launched per batch [default: 100]
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Simultaneous probes per host [default: 500]
    #[arg(short = 'c', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Simultaneous hosts in a network sweep [default: 100]
    #[arg(long, value_name = "N")]
    pub host_concurrency: Option<usize>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Write open ports to a CSV file
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Sweep every host of a network without pinging it first
    #[arg(long)]
    pub skip_ping: bool,
}

impl ScanCommand {
    /// Flags override whatever the settings file said.
    pub fn apply_to(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(port) = self.start_port {
            settings.start_port = port;
        }
        if let Some(port) = self.end_port {
            settings.end_port = port;
        }
        if let Some(ms) = self.timeout {
            settings.connect_timeout_ms = ms;
        }
        if let Some(ms) = self.banner_timeout {
            settings.banner_timeout_ms = ms;
        }
        if let Some(n) = self.batch_size {
            settings.batch_size = n;
        }
        if let Some(n) = self.concurrency {
            settings.port_concurrency = n;
        }
        if let Some(n) = self.host_concurrency {
            settings.host_concurrency = n;
        }
        if self.services.is_some() {
            settings.services_csv = self.services.clone();
        }
        if self.csv.is_some() {
            settings.csv_output = self.csv.clone();
        }
        settings.skip_ping |= self.skip_ping;
        settings
    }

    /// Execute the scan.
    pub async fn execute(
        &self,
        settings: AppSettings,
        verbose: bool,
        quiet: bool,
    ) -> CliResult<()> {
        let settings = self.apply_to(settings);
        settings.validate()?;

        let range = PortRange::from_bounds(settings.start_port, settings.end_port)?;
        let target = TargetSpec::parse(&self.target)?.resolve().await?;
        let catalog = load_catalog(settings.services_csv.as_deref())?;
        info!(entries = catalog.len(), "service catalog loaded");

        let prober = TcpProber::new(Arc::new(catalog), Arc::new(PluginRegistry::with_defaults()))
            .with_connect_timeout(settings.connect_timeout())
            .with_banner_timeout(settings.banner_timeout());

        let cancel = CancellationToken::new();
        spawn_interrupt_handler(cancel.clone());

        let hosts = target.hosts();
        if !quiet && self.output == OutputFormat::Plain {
            output::print_scan_header(&target.to_string(), hosts.len(), range.len());
        }

        let host_engine = HostSweepEngine::new(Arc::new(prober))
            .with_port_concurrency(settings.port_concurrency)
            .with_batch_size(settings.batch_size)
            .with_cancellation(cancel.clone())
            .with_progress(verbose && matches!(target, ScanTarget::Host { .. }));

        match target {
            ScanTarget::Host { ip, .. } => {
                let outcome = host_engine.sweep(ip, range).await;
                output::format_outcome(&outcome, self.output)?;

                if let Some(path) = &settings.csv_output {
                    match output::write_csv(path, &outcome) {
                        Ok(()) if !quiet && self.output == OutputFormat::Plain => {
                            output::print_success(&format!(
                                "Results written to {}",
                                path.display()
                            ));
                        }
                        Ok(()) => {}
                        Err(e) => {
                            warn!(error = %e, "csv report not written");
                            output::print_error(&e.to_string());
                        }
                    }
                }
            }
            ScanTarget::Network(_) => {
                let liveness: Arc<dyn LivenessProbe> = if settings.skip_ping {
                    Arc::new(AssumeAlive)
                } else {
                    Arc::new(PingProbe::default())
                };
                let engine = NetworkSweepEngine::new(Arc::new(host_engine), liveness)
                    .with_host_concurrency(settings.host_concurrency)
                    .with_cancellation(cancel);

                let report = engine.sweep(hosts, range).await;
                output::format_report(&report, self.output)?;

                if let Some(path) = &settings.csv_output {
                    let (written, failures) = output::write_host_csvs(path, &report.outcomes);
                    for failure in &failures {
                        output::print_error(&failure.to_string());
                    }
                    if !quiet && self.output == OutputFormat::Plain {
                        output::print_success(&format!(
                            "Results for {} of {} hosts written next to {}",
                            written,
                            report.outcomes.len(),
                            path.display()
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

fn load_catalog(path: Option<&Path>) -> CliResult<ServiceCatalog> {
    match path {
        Some(path) => Ok(ServiceCatalog::from_path(path)?),
        None => Ok(ServiceCatalog::builtin()),
    }
}

/// Cancel the sweep on Ctrl-C. In-flight probes finish; no new batch starts.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current batch");
            cancel.cancel();
        }
    });
}
