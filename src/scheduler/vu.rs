use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::checks::CheckEvaluator;
use crate::executor::RequestExecutor;
use crate::metrics::MetricsAggregator;
use crate::scenario::{Scenario, ScenarioEnv, VuContext};

/// Everything a virtual-user loop needs, shared read-only across loops.
/// The aggregator is the only thing loops write to.
pub struct VuShared {
    pub scenario: Arc<dyn Scenario>,
    pub executor: Arc<dyn RequestExecutor>,
    pub metrics: Arc<MetricsAggregator>,
    pub env: Arc<ScenarioEnv>,
    pub pause: Duration,
}

/// Run iterations until `stop` is cancelled. Returns the number of completed
/// iterations.
///
/// `stop` is only honored between iterations and during the pause; a
/// request in flight always runs to completion.
pub async fn run(vu_id: u64, shared: Arc<VuShared>, stop: CancellationToken) -> Result<u64> {
    let evaluator = CheckEvaluator::new(&shared.metrics);
    let mut iteration = 0u64;

    while !stop.is_cancelled() {
        let ctx = VuContext {
            vu_id,
            iteration,
            started_at: Utc::now(),
            env: Arc::clone(&shared.env),
        };
        let steps = shared
            .scenario
            .iteration(&ctx)
            .with_context(|| format!("scenario '{}' failed on vu {vu_id}", shared.scenario.name()))?;

        for step in &steps {
            let outcome = shared.executor.execute(&step.request).await;
            let failed = !shared.env.expected_statuses.matches(&outcome);
            shared
                .metrics
                .record_request(&step.request.tag, &outcome, failed);
            evaluator.evaluate(&outcome, &step.checks);
        }
        shared.metrics.record_iteration();
        iteration += 1;
        trace!(vu_id, iteration, "iteration complete");

        if shared.pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(shared.pause) => {}
            }
        }
    }

    Ok(iteration)
}
