//! Immutable point-in-time view of the aggregated run metrics.
//!
//! Latencies are stored sorted, so every query is a pure function of the
//! sample multiset and does not depend on insertion order.

use std::collections::BTreeMap;

/// Latencies (milliseconds, ascending) and failure count for one tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSeries {
    latencies_ms: Vec<f64>,
    failed: u64,
}

static EMPTY_SERIES: TagSeries = TagSeries {
    latencies_ms: Vec::new(),
    failed: 0,
};

impl TagSeries {
    pub(crate) fn from_unsorted(mut latencies_ms: Vec<f64>, failed: u64) -> Self {
        latencies_ms.sort_by(f64::total_cmp);
        Self {
            latencies_ms,
            failed,
        }
    }

    pub fn count(&self) -> u64 {
        self.latencies_ms.len() as u64
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Failed / total. 0 when there are no requests.
    pub fn failure_rate(&self) -> f64 {
        if self.latencies_ms.is_empty() {
            return 0.0;
        }
        self.failed as f64 / self.latencies_ms.len() as f64
    }

    /// Percentile `p` in `[0, 100]`, linearly interpolated between the closest
    /// ranks. 0 for an empty series.
    pub fn percentile(&self, p: f64) -> f64 {
        let n = self.latencies_ms.len();
        if n == 0 {
            return 0.0;
        }
        let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let (a, b) = (self.latencies_ms[lo], self.latencies_ms[hi]);
        a + (b - a) * (rank - lo as f64)
    }

    pub fn median(&self) -> f64 {
        self.percentile(50.0)
    }

    pub fn mean(&self) -> f64 {
        if self.latencies_ms.is_empty() {
            return 0.0;
        }
        self.latencies_ms.iter().sum::<f64>() / self.latencies_ms.len() as f64
    }

    pub fn min(&self) -> f64 {
        self.latencies_ms.first().copied().unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.latencies_ms.last().copied().unwrap_or(0.0)
    }
}

/// Passed/failed tally for one named check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckTally {
    pub passes: u64,
    pub fails: u64,
}

impl CheckTally {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    /// Passed / total. 0 when the check never ran.
    pub fn rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passes as f64 / total as f64,
        }
    }

    fn merge(self, other: CheckTally) -> CheckTally {
        CheckTally {
            passes: self.passes + other.passes,
            fails: self.fails + other.fails,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub iterations: u64,
    pub vus_max: u64,
    pub(crate) all: TagSeries,
    pub(crate) by_tag: BTreeMap<String, TagSeries>,
    pub(crate) checks: BTreeMap<String, CheckTally>,
    pub(crate) status_counts: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Series for `tag`, or for every request when `tag` is `None`.
    /// Unknown tags yield an empty series.
    pub fn series(&self, tag: Option<&str>) -> &TagSeries {
        match tag {
            None => &self.all,
            Some(tag) => self.by_tag.get(tag).unwrap_or(&EMPTY_SERIES),
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = (&str, &TagSeries)> {
        self.by_tag.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Tally for one check, or all checks combined when `name` is `None`.
    pub fn check(&self, name: Option<&str>) -> CheckTally {
        match name {
            Some(name) => self.checks.get(name).copied().unwrap_or_default(),
            None => self
                .checks
                .values()
                .fold(CheckTally::default(), |acc, t| acc.merge(*t)),
        }
    }

    pub fn checks(&self) -> impl Iterator<Item = (&str, CheckTally)> {
        self.checks.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Responses by status code, plus `timeout` / `network:<kind>` for errors.
    pub fn status_counts(&self) -> &BTreeMap<String, u64> {
        &self.status_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> TagSeries {
        TagSeries::from_unsorted(values.to_vec(), 0)
    }

    #[test]
    fn test_percentile_interpolates() {
        let s = series(&[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(s.percentile(0.0), 10.0);
        assert_eq!(s.percentile(100.0), 40.0);
        assert!((s.percentile(50.0) - 25.0).abs() < 1e-9);
        assert!((s.percentile(95.0) - 38.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_series_is_zero() {
        let s = TagSeries::default();
        assert_eq!(s.count(), 0);
        assert_eq!(s.percentile(95.0), 0.0);
        assert_eq!(s.mean(), 0.0);
        assert_eq!(s.failure_rate(), 0.0);
    }

    #[test]
    fn test_single_sample() {
        let s = series(&[42.0]);
        assert_eq!(s.percentile(99.0), 42.0);
        assert_eq!(s.min(), 42.0);
        assert_eq!(s.max(), 42.0);
    }

    #[test]
    fn test_check_tally_rate() {
        let t = CheckTally { passes: 3, fails: 1 };
        assert_eq!(t.total(), 4);
        assert!((t.rate() - 0.75).abs() < 1e-9);
        assert_eq!(CheckTally::default().rate(), 0.0);
    }

    #[test]
    fn test_unknown_tag_is_empty() {
        let snap = MetricsSnapshot::default();
        assert_eq!(snap.series(Some("missing")).count(), 0);
        assert_eq!(snap.check(Some("missing")).total(), 0);
    }
}
