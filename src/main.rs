use anyhow::Context;
use clap::Parser;
use portsweep::cli::Cli;
use portsweep::config::AppSettings;
use portsweep::logging::{init_logging_with_config, LogConfig, LogFormat};
use portsweep::output;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_logging_with_config(&LogConfig::from_flags(cli.verbose, cli.quiet).with_format(format))
        .context("failed to initialize logging")?;

    let settings = AppSettings::load(cli.config.as_deref()).context("failed to load settings")?;

    cli.scan
        .execute(settings, cli.verbose, cli.quiet)
        .await
        .context("scan failed")
}
