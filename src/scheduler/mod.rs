//! Ramping virtual-user scheduler.
//!
//! Every tick the scheduler computes the ramp target for the elapsed time and
//! reconciles the [`VuPool`] to it. When the last stage ends, or the run is
//! stopped, every loop finishes its current iteration and the pool drains.

pub mod pool;
pub mod ramp;
pub mod vu;

pub use pool::VuPool;
pub use ramp::Ramp;
pub use vu::VuShared;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How a scheduler run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    /// All stages ran to completion.
    Completed,
    /// The stop token was cancelled before the last stage ended.
    Stopped,
}

pub struct Scheduler {
    ramp: Ramp,
    tick: Duration,
    pool: VuPool,
}

impl Scheduler {
    pub fn new(ramp: Ramp, tick: Duration, shared: Arc<VuShared>) -> Self {
        Self {
            ramp,
            tick,
            pool: VuPool::new(shared),
        }
    }

    /// Live count of active virtual users.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.pool.subscribe()
    }

    pub async fn run(mut self, stop: CancellationToken) -> SchedulerExit {
        let total = self.ramp.total_duration();
        info!(
            stages = self.ramp.stages().len(),
            total = ?total,
            peak_vus = self.ramp.peak(),
            "starting ramp"
        );

        let start = Instant::now();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let exit = loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break SchedulerExit::Stopped,
                _ = ticker.tick() => {}
            }

            let elapsed = start.elapsed();
            if elapsed >= total {
                break SchedulerExit::Completed;
            }
            let target = self.ramp.target_at(elapsed);
            if target as usize != self.pool.active() {
                debug!(target, active = self.pool.active(), elapsed = ?elapsed, "reconciling");
            }
            self.pool.reconcile(target as usize);
        };

        info!(exit = ?exit, elapsed = ?start.elapsed(), "ramp finished");
        self.pool.drain().await;
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExpectedStatuses, Outcome, RequestDescriptor, Stage};
    use crate::executor::RequestExecutor;
    use crate::metrics::MetricsAggregator;
    use crate::scenario::{Scenario, ScenarioEnv, Step, VuContext};
    use async_trait::async_trait;

    struct InstantExecutor;

    #[async_trait]
    impl RequestExecutor for InstantExecutor {
        async fn execute(&self, _request: &RequestDescriptor) -> Outcome {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Outcome::response(200, Duration::from_millis(20), None)
        }
    }

    struct Ping;

    impl Scenario for Ping {
        fn name(&self) -> &str {
            "ping"
        }

        fn iteration(&self, ctx: &VuContext) -> anyhow::Result<Vec<Step>> {
            Ok(vec![Step::new(RequestDescriptor::get(ctx.env.url("/ping")))])
        }
    }

    fn scheduler(stages: Vec<Stage>) -> (Scheduler, Arc<MetricsAggregator>) {
        let metrics = Arc::new(MetricsAggregator::new());
        let shared = Arc::new(VuShared {
            scenario: Arc::new(Ping),
            executor: Arc::new(InstantExecutor),
            metrics: metrics.clone(),
            env: Arc::new(ScenarioEnv {
                base_url: "http://stub".into(),
                expected_statuses: ExpectedStatuses::default(),
            }),
            pause: Duration::from_millis(50),
        });
        let ramp = Ramp::new(stages).unwrap();
        (
            Scheduler::new(ramp, Duration::from_millis(100), shared),
            metrics,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_count_follows_ramp() {
        let (scheduler, metrics) = scheduler(vec![
            Stage::new(Duration::from_secs(1), 4),
            Stage::new(Duration::from_secs(1), 4),
            Stage::new(Duration::from_secs(1), 0),
        ]);
        let rx = scheduler.subscribe();
        let handle = tokio::spawn(scheduler.run(CancellationToken::new()));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(*rx.borrow(), 4);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        // halfway down 4 -> 0, within one tick
        let active = *rx.borrow();
        assert!((1..=3).contains(&active), "active = {active}");

        assert_eq!(handle.await.unwrap(), SchedulerExit::Completed);
        assert_eq!(*rx.borrow(), 0);

        let snap = metrics.snapshot();
        assert_eq!(snap.vus_max, 4);
        assert!(snap.iterations > 0);
        assert_eq!(snap.series(None).count(), snap.iterations);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_token_ends_run_early() {
        let (scheduler, metrics) = scheduler(vec![Stage::new(Duration::from_secs(60), 3)]);
        let stop = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(stop.clone()));

        tokio::time::sleep(Duration::from_millis(500)).await;
        stop.cancel();

        assert_eq!(handle.await.unwrap(), SchedulerExit::Stopped);
        assert!(metrics.snapshot().iterations > 0);
    }
}
