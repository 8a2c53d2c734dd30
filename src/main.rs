use anyhow::{Context, Result};
use clap::Parser;
use rampload::config::Config;
use rampload::executor::http::HttpExecutor;
use rampload::report::{ExitStatus, ReportFormat};
use rampload::scenario::TeamScenario;
use rampload::{telemetry, Runner};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Ramping virtual-user load test against the team API.
#[derive(Debug, Parser)]
#[command(name = "rampload", version, about)]
struct Cli {
    /// TOML file layered over config/default.toml.
    #[arg(short, long, env = "RAMPLOAD_CONFIG")]
    config: Option<PathBuf>,

    /// Target base URL. Overrides every other source.
    #[arg(long)]
    base_url: Option<String>,

    /// Report format: human or json.
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Write the report to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn apply(self, cfg: &mut Config) {
        if let Some(base_url) = self.base_url {
            cfg.target.base_url = base_url;
        }
        if let Some(format) = self.format {
            cfg.report.format = format;
        }
        if let Some(output) = self.output {
            cfg.report.output = Some(output);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing();

    let (cfg, runner) = match prepare(cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            error!(error = %format!("{e:#}"), "invalid configuration");
            return ExitCode::from(ExitStatus::InvalidConfig.code());
        }
    };

    let stop = CancellationToken::new();
    let on_signal = stop.clone();
    tokio::spawn(async move {
        telemetry::shutdown_signal().await;
        on_signal.cancel();
    });

    let report = runner.run(stop).await;
    if let Err(e) = report.write_to(cfg.report.format, cfg.report.output.as_deref()) {
        error!(error = %e, "failed to write report");
        return ExitCode::FAILURE;
    }

    info!(exit_code = report.exit_status.code(), "done");
    ExitCode::from(report.exit_status.code())
}

fn prepare(cli: Cli) -> Result<(Config, Runner)> {
    let mut cfg = Config::load(cli.config.as_deref())?;
    cli.apply(&mut cfg);

    let executor = HttpExecutor::new(cfg.run.request_timeout).context("building HTTP client")?;
    let runner = Runner::new(&cfg, Arc::new(TeamScenario), Arc::new(executor))?;
    Ok((cfg, runner))
}
