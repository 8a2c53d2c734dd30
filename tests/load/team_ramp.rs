use rampload::config::Config;
use rampload::executor::http::HttpExecutor;
use rampload::report::{ExitStatus, StopReason};
use rampload::scenario::TeamScenario;
use rampload::Runner;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::common;

async fn full_profile(delay: Duration) -> rampload::RunReport {
    let server = common::team_api(201, 200, delay).await;
    let mut config = Config::default();
    config.target.base_url = server.uri();

    let executor = HttpExecutor::new(config.run.request_timeout).unwrap();
    Runner::new(&config, Arc::new(TeamScenario), Arc::new(executor))
        .unwrap()
        .run(CancellationToken::new())
        .await
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // 90 s ramp
async fn test_full_ramp_under_latency_budget() {
    let started = Instant::now();
    let report = full_profile(Duration::from_millis(50)).await;

    assert!(started.elapsed() >= Duration::from_secs(90));
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_eq!(report.exit_status, ExitStatus::Passed);
    assert_eq!(report.vus_max, 20);
    // two requests per iteration, ~3 iterations per VU-second
    assert!(report.requests.count > 1_000, "{}", report.requests.count);
    let p95 = report.requests.p95;
    assert!((50.0..100.0).contains(&p95), "p95 = {p95}");
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // 90 s ramp
async fn test_full_ramp_with_slow_backend_fails() {
    let report = full_profile(Duration::from_millis(500)).await;

    assert_eq!(report.exit_status, ExitStatus::ThresholdsFailed);
    let latency = report
        .thresholds
        .iter()
        .find(|t| t.metric == "http_req_duration")
        .unwrap();
    assert!(!latency.passed);
    assert!(latency.observed >= 300.0);
    assert!(report.requests.p95 >= 500.0);
    assert_eq!(report.requests.failed, 0);
}
