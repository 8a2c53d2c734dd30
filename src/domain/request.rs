use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;

/// Tag used when a request is built without one.
pub const DEFAULT_TAG: &str = "default";

/// A single HTTP request a scenario wants executed.
///
/// Built once per iteration and never mutated afterwards; the executor only
/// borrows it.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Metrics grouping label, e.g. `create_team`.
    pub tag: String,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: BTreeMap::new(),
            tag: DEFAULT_TAG.to_string(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `payload` as the body and mark it as JSON.
    pub fn with_json<T: Serialize>(self, payload: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_string(payload)?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_body(body))
    }
}
