//! Threshold evaluation over aggregated metrics.
//!
//! Thresholds use the k6 syntax: a metric key such as
//! `http_req_duration{name:create_team}` mapped to expressions such as
//! `p(95)<300`. Durations are compared in milliseconds.

mod parse;

pub use parse::ThresholdParseError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::metrics::MetricsSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricSelector {
    RequestDuration { tag: Option<String> },
    RequestFailed { tag: Option<String> },
    Requests { tag: Option<String> },
    Checks { check: Option<String> },
    Iterations,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statistic {
    Percentile(f64),
    Avg,
    Min,
    Max,
    Med,
    Rate,
    Count,
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Percentile(p) => write!(f, "p({p})"),
            Statistic::Avg => f.write_str("avg"),
            Statistic::Min => f.write_str("min"),
            Statistic::Max => f.write_str("max"),
            Statistic::Med => f.write_str("med"),
            Statistic::Rate => f.write_str("rate"),
            Statistic::Count => f.write_str("count"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Comparison {
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
}

impl Comparison {
    pub fn holds(self, observed: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => observed < bound,
            Comparison::Le => observed <= bound,
            Comparison::Gt => observed > bound,
            Comparison::Ge => observed >= bound,
            Comparison::Eq => observed == bound,
            Comparison::Ne => observed != bound,
        }
    }
}

/// A threshold as written in the configuration: a bare expression or a
/// table with `abort_on_fail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdEntry {
    Expression(String),
    Detailed {
        threshold: String,
        #[serde(default)]
        abort_on_fail: bool,
    },
}

impl ThresholdEntry {
    fn parts(&self) -> (&str, bool) {
        match self {
            ThresholdEntry::Expression(expr) => (expr, false),
            ThresholdEntry::Detailed {
                threshold,
                abort_on_fail,
            } => (threshold, *abort_on_fail),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSpec {
    /// Metric key as written, e.g. `http_req_duration{name:get_team}`.
    pub metric_name: String,
    /// Expression as written, e.g. `p(95)<300`.
    pub expression: String,
    pub metric: MetricSelector,
    pub statistic: Statistic,
    pub comparison: Comparison,
    pub bound: f64,
    pub abort_on_fail: bool,
}

impl ThresholdSpec {
    pub fn parse(metric_name: &str, expression: &str) -> Result<Self, ThresholdParseError> {
        let metric = parse::parse_metric(metric_name)?;
        let (statistic, comparison, bound) = parse::parse_expression(expression)?;
        parse::check_supported(&metric, statistic, metric_name)?;
        Ok(Self {
            metric_name: metric_name.trim().to_string(),
            expression: expression.trim().to_string(),
            metric,
            statistic,
            comparison,
            bound,
            abort_on_fail: false,
        })
    }

    pub fn with_abort_on_fail(mut self, abort: bool) -> Self {
        self.abort_on_fail = abort;
        self
    }

    /// Current value of the selected statistic.
    pub fn observe(&self, snapshot: &MetricsSnapshot) -> f64 {
        match &self.metric {
            MetricSelector::RequestDuration { tag } => {
                let series = snapshot.series(tag.as_deref());
                match self.statistic {
                    Statistic::Percentile(p) => series.percentile(p),
                    Statistic::Avg => series.mean(),
                    Statistic::Min => series.min(),
                    Statistic::Max => series.max(),
                    Statistic::Med => series.median(),
                    Statistic::Count => series.count() as f64,
                    Statistic::Rate => 0.0,
                }
            }
            MetricSelector::RequestFailed { tag } => {
                let series = snapshot.series(tag.as_deref());
                match self.statistic {
                    Statistic::Count => series.failed() as f64,
                    _ => series.failure_rate(),
                }
            }
            MetricSelector::Requests { tag } => snapshot.series(tag.as_deref()).count() as f64,
            MetricSelector::Checks { check } => {
                let tally = snapshot.check(check.as_deref());
                match self.statistic {
                    Statistic::Count => tally.passes as f64,
                    _ => tally.rate(),
                }
            }
            MetricSelector::Iterations => snapshot.iterations as f64,
        }
    }

    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> ThresholdResult {
        let observed = self.observe(snapshot);
        ThresholdResult {
            metric: self.metric_name.clone(),
            expression: self.expression.clone(),
            observed,
            passed: self.comparison.holds(observed, self.bound),
            abort_on_fail: self.abort_on_fail,
        }
    }
}

/// Parse the configured `metric -> [threshold]` table.
pub fn parse_all(
    table: &BTreeMap<String, Vec<ThresholdEntry>>,
) -> Result<Vec<ThresholdSpec>, ThresholdParseError> {
    let mut specs = Vec::new();
    for (metric, entries) in table {
        for entry in entries {
            let (expression, abort) = entry.parts();
            specs.push(ThresholdSpec::parse(metric, expression)?.with_abort_on_fail(abort));
        }
    }
    Ok(specs)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: f64,
    pub passed: bool,
    pub abort_on_fail: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ThresholdReport {
    pub results: Vec<ThresholdResult>,
    pub passed: bool,
}

impl ThresholdReport {
    pub fn failed(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// True when a failed threshold asks for the run to be aborted.
    pub fn should_abort(&self) -> bool {
        self.failed().any(|r| r.abort_on_fail)
    }
}

/// Evaluate all thresholds. The run passes iff every threshold holds;
/// an empty list passes.
pub fn evaluate(specs: &[ThresholdSpec], snapshot: &MetricsSnapshot) -> ThresholdReport {
    let results: Vec<ThresholdResult> = specs.iter().map(|s| s.evaluate(snapshot)).collect();
    let passed = results.iter().all(|r| r.passed);
    ThresholdReport { results, passed }
}
