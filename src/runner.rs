//! One complete load run: validate, ramp, watch thresholds, report.

use chrono::Utc;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ConfigError;
use crate::executor::RequestExecutor;
use crate::metrics::MetricsAggregator;
use crate::report::{RunReport, StopReason};
use crate::scenario::{Scenario, ScenarioEnv};
use crate::scheduler::{Ramp, Scheduler, SchedulerExit, VuShared};
use crate::thresholds::{self, ThresholdSpec};

pub struct Runner {
    ramp: Ramp,
    thresholds: Vec<ThresholdSpec>,
    shared: Arc<VuShared>,
    tick: Duration,
    check_interval: Duration,
}

impl Runner {
    /// Validate `config` and wire the run. Nothing is sent until [`Runner::run`].
    pub fn new(
        config: &Config,
        scenario: Arc<dyn Scenario>,
        executor: Arc<dyn RequestExecutor>,
    ) -> Result<Self, ConfigError> {
        validate_base_url(&config.target.base_url)?;
        non_zero("run.request_timeout", config.run.request_timeout)?;
        non_zero("run.scheduler_tick", config.run.scheduler_tick)?;
        non_zero(
            "run.threshold_check_interval",
            config.run.threshold_check_interval,
        )?;

        let ramp = Ramp::new(config.run.stages.clone())?;
        let thresholds = thresholds::parse_all(&config.thresholds)?;

        let shared = Arc::new(VuShared {
            scenario,
            executor,
            metrics: Arc::new(MetricsAggregator::new()),
            env: Arc::new(ScenarioEnv {
                base_url: config.target.base_url.clone(),
                expected_statuses: config.target.expected_statuses.clone(),
            }),
            pause: config.run.iteration_pause,
        });

        Ok(Self {
            ramp,
            thresholds,
            shared,
            tick: config.run.scheduler_tick,
            check_interval: config.run.threshold_check_interval,
        })
    }

    /// Drive the ramp to completion, an `abort_on_fail` threshold breach, or
    /// cancellation of `external_stop`, whichever comes first. In every case
    /// in-flight iterations finish before the report is built.
    pub async fn run(self, external_stop: CancellationToken) -> RunReport {
        let started_at = Utc::now();
        let clock = tokio::time::Instant::now();
        let scenario = self.shared.scenario.name().to_string();
        let metrics = Arc::clone(&self.shared.metrics);
        let watch_thresholds = self.thresholds.iter().any(|t| t.abort_on_fail);

        info!(
            scenario = %scenario,
            base_url = %self.shared.env.base_url,
            thresholds = self.thresholds.len(),
            "load run starting"
        );

        let stop = CancellationToken::new();
        let scheduler = Scheduler::new(self.ramp, self.tick, Arc::clone(&self.shared));
        let mut scheduler = tokio::spawn(scheduler.run(stop.clone()));

        let mut watchdog = tokio::time::interval_at(
            tokio::time::Instant::now() + self.check_interval,
            self.check_interval,
        );
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut requested: Option<StopReason> = None;
        let exit = loop {
            tokio::select! {
                biased;
                joined = &mut scheduler => break joined,
                _ = external_stop.cancelled(), if requested.is_none() => {
                    warn!("interrupted, waiting for in-flight iterations");
                    requested = Some(StopReason::Interrupted);
                    stop.cancel();
                }
                _ = watchdog.tick(), if watch_thresholds && requested.is_none() => {
                    let report = thresholds::evaluate(&self.thresholds, &metrics.snapshot());
                    if report.should_abort() {
                        for failed in report.failed().filter(|r| r.abort_on_fail) {
                            warn!(
                                metric = %failed.metric,
                                expression = %failed.expression,
                                observed = failed.observed,
                                "threshold crossed, aborting run"
                            );
                        }
                        requested = Some(StopReason::ThresholdAbort);
                        stop.cancel();
                    }
                }
            }
        };

        let stop_reason = match exit {
            Ok(SchedulerExit::Completed) => requested.unwrap_or(StopReason::Completed),
            Ok(SchedulerExit::Stopped) => requested.unwrap_or(StopReason::Interrupted),
            Err(e) => {
                error!(error = %e, "scheduler task failed");
                requested.unwrap_or(StopReason::Interrupted)
            }
        };

        let snapshot = metrics.snapshot();
        let results = thresholds::evaluate(&self.thresholds, &snapshot);
        let report = RunReport::new(
            &scenario,
            started_at,
            clock.elapsed(),
            stop_reason,
            &snapshot,
            results,
        );

        info!(
            stop_reason = %report.stop_reason,
            requests = report.requests.count,
            iterations = report.iterations,
            passed = report.passed,
            "load run finished"
        );
        report
    }
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

fn non_zero(key: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidSetting {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
