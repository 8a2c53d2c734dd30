//! End-of-run summary for CI and humans.

mod human;
mod json;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::metrics::{CheckTally, MetricsSnapshot, TagSeries};
use crate::thresholds::{ThresholdReport, ThresholdResult};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    Completed,
    ThresholdAbort,
    Interrupted,
}

/// Process exit codes, aligned with k6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Passed,
    ThresholdsFailed,
    InvalidConfig,
    Interrupted,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Passed => 0,
            ExitStatus::ThresholdsFailed => 99,
            ExitStatus::InvalidConfig => 104,
            ExitStatus::Interrupted => 105,
        }
    }
}

/// Latency figures in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestStats {
    pub count: u64,
    pub failed: u64,
    pub failure_rate: f64,
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

impl From<&TagSeries> for RequestStats {
    fn from(s: &TagSeries) -> Self {
        Self {
            count: s.count(),
            failed: s.failed(),
            failure_rate: s.failure_rate(),
            avg: s.mean(),
            min: s.min(),
            med: s.median(),
            p90: s.percentile(90.0),
            p95: s.percentile(95.0),
            p99: s.percentile(99.0),
            max: s.max(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckStats {
    pub passes: u64,
    pub fails: u64,
    pub rate: f64,
}

impl From<CheckTally> for CheckStats {
    fn from(t: CheckTally) -> Self {
        Self {
            passes: t.passes,
            fails: t.fails,
            rate: t.rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub scenario: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(with = "crate::utils::duration")]
    pub duration: Duration,
    pub stop_reason: StopReason,
    pub iterations: u64,
    pub vus_max: u64,
    pub requests: RequestStats,
    pub requests_by_tag: BTreeMap<String, RequestStats>,
    pub status_counts: BTreeMap<String, u64>,
    pub checks: BTreeMap<String, CheckStats>,
    pub thresholds: Vec<ThresholdResult>,
    pub passed: bool,
    pub exit_status: ExitStatus,
}

impl RunReport {
    pub fn new(
        scenario: &str,
        started_at: DateTime<Utc>,
        duration: Duration,
        stop_reason: StopReason,
        snapshot: &MetricsSnapshot,
        thresholds: ThresholdReport,
    ) -> Self {
        let finished_at = Utc::now();
        let exit_status = match (stop_reason, thresholds.passed) {
            (StopReason::Interrupted, _) => ExitStatus::Interrupted,
            (_, false) => ExitStatus::ThresholdsFailed,
            (StopReason::ThresholdAbort, true) => ExitStatus::ThresholdsFailed,
            (StopReason::Completed, true) => ExitStatus::Passed,
        };

        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.to_string(),
            started_at,
            finished_at,
            duration,
            stop_reason,
            iterations: snapshot.iterations,
            vus_max: snapshot.vus_max,
            requests: snapshot.series(None).into(),
            requests_by_tag: snapshot
                .tags()
                .map(|(tag, series)| (tag.to_string(), series.into()))
                .collect(),
            status_counts: snapshot.status_counts().clone(),
            checks: snapshot
                .checks()
                .map(|(name, tally)| (name.to_string(), tally.into()))
                .collect(),
            passed: thresholds.passed && exit_status == ExitStatus::Passed,
            thresholds: thresholds.results,
            exit_status,
        }
    }

    pub fn render<W: Write>(&self, format: ReportFormat, out: &mut W) -> io::Result<()> {
        match format {
            ReportFormat::Human => human::render(self, out),
            ReportFormat::Json => json::render(self, out),
        }
    }

    /// Render to `path`, or stdout when `path` is `None`.
    pub fn write_to(&self, format: ReportFormat, path: Option<&Path>) -> io::Result<()> {
        match path {
            Some(path) => {
                let mut out = BufWriter::new(File::create(path)?);
                self.render(format, &mut out)?;
                out.flush()
            }
            None => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                self.render(format, &mut out)?;
                out.flush()
            }
        }
    }
}
