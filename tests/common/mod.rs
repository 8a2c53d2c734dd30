#![allow(dead_code)]

use rampload::domain::ExpectedStatuses;
use rampload::scenario::ScenarioEnv;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stub team API answering `POST /team/add` with `create_status` and
/// `GET /team/get` with `get_status`, each after `delay`.
pub async fn team_api(create_status: u16, get_status: u16, delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/team/add"))
        .respond_with(ResponseTemplate::new(create_status).set_delay(delay))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/team/get"))
        .respond_with(
            ResponseTemplate::new(get_status)
                .set_body_string(r#"{"members":[]}"#)
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

pub fn env(server: &MockServer) -> ScenarioEnv {
    ScenarioEnv {
        base_url: server.uri(),
        expected_statuses: ExpectedStatuses::default(),
    }
}
