//! Run-wide metrics aggregation.
//!
//! Every virtual-user loop appends into one shared [`MetricsAggregator`].
//! All samples are retained so percentiles are exact; memory is bounded by
//! run duration times throughput, which is finite for a stage-defined run.

pub mod snapshot;

pub use snapshot::{CheckTally, MetricsSnapshot, TagSeries};

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::domain::{CheckResult, ErrorKind, MetricSample, Outcome};

#[derive(Debug, Default)]
struct TagSamples {
    samples: Vec<MetricSample>,
    failed: u64,
}

#[derive(Debug, Default)]
struct Inner {
    by_tag: HashMap<String, TagSamples>,
    checks: HashMap<String, CheckTally>,
    status_counts: HashMap<String, u64>,
    iterations: u64,
    vus_max: u64,
}

/// Thread-safe, append-only metrics store.
///
/// The lock only guards appends and the raw copy taken by [`snapshot`];
/// sorting happens after it is released.
///
/// [`snapshot`]: MetricsAggregator::snapshot
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    inner: Mutex<Inner>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record exactly one latency sample for an executed request.
    pub fn record_request(&self, tag: &str, outcome: &Outcome, failed: bool) {
        let sample = MetricSample {
            tag: tag.to_string(),
            latency: outcome.latency,
            timestamp: Utc::now(),
            failed,
        };
        let status_key = match (&outcome.status, &outcome.error) {
            (Some(code), _) => code.to_string(),
            (None, Some(err)) if err.kind == ErrorKind::Timeout => "timeout".to_string(),
            (None, Some(err)) => format!("network:{}", err.detail),
            (None, None) => "unknown".to_string(),
        };

        let mut inner = self.inner.lock();
        let series = inner.by_tag.entry(sample.tag.clone()).or_default();
        series.failed += u64::from(failed);
        series.samples.push(sample);
        *inner.status_counts.entry(status_key).or_insert(0) += 1;
    }

    pub fn record_check(&self, result: &CheckResult) {
        let mut inner = self.inner.lock();
        let tally = inner.checks.entry(result.name.clone()).or_default();
        if result.passed {
            tally.passes += 1;
        } else {
            tally.fails += 1;
        }
    }

    pub fn record_iteration(&self) {
        self.inner.lock().iterations += 1;
    }

    /// Track the peak number of concurrently active virtual users.
    pub fn observe_vus(&self, active: u64) {
        let mut inner = self.inner.lock();
        inner.vus_max = inner.vus_max.max(active);
    }

    /// Copy the current state into an immutable, query-friendly snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (raw, checks, status_counts, iterations, vus_max) = {
            let inner = self.inner.lock();
            let raw: Vec<(String, Vec<Duration>, u64)> = inner
                .by_tag
                .iter()
                .map(|(tag, series)| {
                    let latencies = series.samples.iter().map(|s| s.latency).collect();
                    (tag.clone(), latencies, series.failed)
                })
                .collect();
            let checks: BTreeMap<String, CheckTally> =
                inner.checks.iter().map(|(k, v)| (k.clone(), *v)).collect();
            let status_counts: BTreeMap<String, u64> = inner
                .status_counts
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect();
            (raw, checks, status_counts, inner.iterations, inner.vus_max)
        };

        let mut all_latencies = Vec::new();
        let mut all_failed = 0;
        let mut by_tag = BTreeMap::new();
        for (tag, latencies, failed) in raw {
            let latencies: Vec<f64> = latencies.into_iter().map(millis).collect();
            all_latencies.extend_from_slice(&latencies);
            all_failed += failed;
            by_tag.insert(tag, TagSeries::from_unsorted(latencies, failed));
        }

        MetricsSnapshot {
            iterations,
            vus_max,
            all: TagSeries::from_unsorted(all_latencies, all_failed),
            by_tag,
            checks,
            status_counts,
        }
    }
}

fn millis(latency: Duration) -> f64 {
    latency.as_nanos() as f64 / 1_000_000.0
}
