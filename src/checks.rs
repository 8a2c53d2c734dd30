use std::fmt;
use std::sync::Arc;

use crate::domain::{CheckResult, ExpectedStatuses, Outcome};
use crate::metrics::MetricsAggregator;

type Predicate = Arc<dyn Fn(&Outcome) -> bool + Send + Sync>;

/// A named boolean assertion over an [`Outcome`].
///
/// Predicates must be pure: no I/O, no shared mutable state.
#[derive(Clone)]
pub struct Check {
    name: String,
    predicate: Predicate,
}

impl Check {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Outcome) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Passes when the response status equals `code`.
    pub fn status(name: impl Into<String>, code: u16) -> Self {
        Self::new(name, move |o: &Outcome| o.status == Some(code))
    }

    /// Passes when the response status is inside `expected`.
    pub fn status_in(name: impl Into<String>, expected: &ExpectedStatuses) -> Self {
        let expected = expected.clone();
        Self::new(name, move |o: &Outcome| expected.matches(o))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, outcome: &Outcome) -> CheckResult {
        CheckResult {
            name: self.name.clone(),
            passed: (self.predicate)(outcome),
        }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

/// Runs checks and forwards every result to the aggregator.
#[derive(Debug, Clone, Copy)]
pub struct CheckEvaluator<'a> {
    metrics: &'a MetricsAggregator,
}

impl<'a> CheckEvaluator<'a> {
    pub fn new(metrics: &'a MetricsAggregator) -> Self {
        Self { metrics }
    }

    pub fn evaluate(&self, outcome: &Outcome, checks: &[Check]) -> Vec<CheckResult> {
        checks
            .iter()
            .map(|check| {
                let result = check.run(outcome);
                self.metrics.record_check(&result);
                result
            })
            .collect()
    }
}
