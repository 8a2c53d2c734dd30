use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::{Duration, Instant};
use tracing::debug;

use super::RequestExecutor;
use crate::domain::{Outcome, RequestDescriptor, RequestError};

/// `reqwest`-backed executor with a bounded per-request timeout.
///
/// Latency covers sending the request and reading the full response body.
#[derive(Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("rampload/", env!("CARGO_PKG_VERSION"))),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: &RequestDescriptor) -> Outcome {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let start = Instant::now();
        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok((status, body))) => Outcome::response(status, start.elapsed(), Some(body)),
            Ok(Err(e)) => {
                let latency = start.elapsed();
                let error = if e.is_timeout() {
                    RequestError::timeout()
                } else {
                    RequestError::network(error_kind(&e))
                };
                debug!(tag = %request.tag, url = %request.url, error = %e, "request failed");
                Outcome::failure(error, latency)
            }
            Err(_) => {
                debug!(tag = %request.tag, url = %request.url, timeout = ?self.timeout, "request timed out");
                Outcome::failure(RequestError::timeout(), start.elapsed())
            }
        }
    }
}

fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_builder() {
        "builder"
    } else if e.is_connect() {
        "connect"
    } else if e.is_redirect() {
        "redirect"
    } else if e.is_body() {
        "body"
    } else if e.is_decode() {
        "decode"
    } else if e.is_request() {
        "request"
    } else {
        "other"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/team/add"))
            .and(header("Content-Type", "application/json"))
            .and(body_string(r#"{"team_name":"t"}"#))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(Duration::from_secs(5)).unwrap();
        let request = RequestDescriptor::post(format!("{}/team/add", server.uri()))
            .with_json(&serde_json::json!({"team_name": "t"}))
            .unwrap();
        let outcome = executor.execute(&request).await;

        assert_eq!(outcome.status, Some(201));
        assert_eq!(outcome.body.as_deref(), Some("created"));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_timeout_has_no_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(Duration::from_millis(50)).unwrap();
        let outcome = executor
            .execute(&RequestDescriptor::get(format!("{}/slow", server.uri())))
            .await;

        assert_eq!(outcome.status, None);
        assert_eq!(outcome.error.as_ref().map(|e| e.kind), Some(ErrorKind::Timeout));
        assert!(outcome.latency >= Duration::from_millis(50));
        assert!(outcome.latency < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let executor = HttpExecutor::new(Duration::from_secs(5)).unwrap();
        let outcome = executor
            .execute(&RequestDescriptor::get(format!("http://127.0.0.1:{port}/")))
            .await;

        let error = outcome.error.expect("network error");
        assert_eq!(outcome.status, None);
        assert_eq!(error.kind, ErrorKind::Network);
        assert_eq!(error.detail, "connect");
    }

    #[tokio::test]
    async fn test_invalid_header_is_builder_error() {
        let executor = HttpExecutor::new(Duration::from_secs(5)).unwrap();
        let request =
            RequestDescriptor::get("http://127.0.0.1:9/").with_header("bad header", "x");
        let outcome = executor.execute(&request).await;
        assert_eq!(outcome.error.map(|e| e.detail), Some("builder".to_string()));
    }
}
