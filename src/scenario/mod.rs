//! Scenario extension point.
//!
//! A [`Scenario`] turns a virtual-user context into the ordered list of
//! requests (each with its checks) for one iteration.

pub mod team;

pub use team::TeamScenario;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

use crate::checks::Check;
use crate::domain::{ExpectedStatuses, RequestDescriptor};

/// Run-wide, read-only settings visible to every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioEnv {
    pub base_url: String,
    pub expected_statuses: ExpectedStatuses,
}

impl ScenarioEnv {
    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Per-iteration context handed to a scenario.
#[derive(Debug, Clone)]
pub struct VuContext {
    pub vu_id: u64,
    /// Zero-based, increases by one per completed iteration of this VU.
    pub iteration: u64,
    pub started_at: DateTime<Utc>,
    pub env: Arc<ScenarioEnv>,
}

impl VuContext {
    /// Collision-free identifier for test data, using the iteration start
    /// time and a random draw.
    pub fn unique_name(&self, prefix: &str) -> String {
        let random = rand::thread_rng().gen_range(0..10_000);
        unique_name(
            prefix,
            self.started_at.timestamp_millis(),
            self.vu_id,
            self.iteration,
            random,
        )
    }
}

/// Builds `{prefix}_{millis}_{vu}_{iteration}_{random}`.
///
/// Two loops never share a `vu_id`, and one loop never repeats an
/// iteration, so uniqueness needs no shared counter.
pub fn unique_name(prefix: &str, unix_millis: i64, vu_id: u64, iteration: u64, random: u32) -> String {
    format!("{prefix}_{unix_millis}_{vu_id}_{iteration}_{random}")
}

/// One request and the checks applied to its outcome.
#[derive(Debug, Clone)]
pub struct Step {
    pub request: RequestDescriptor,
    pub checks: Vec<Check>,
}

impl Step {
    pub fn new(request: RequestDescriptor) -> Self {
        Self {
            request,
            checks: Vec::new(),
        }
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }
}

pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    /// Steps for one iteration, executed in order. An `Err` is an internal
    /// failure: the calling virtual user stops and is replaced.
    fn iteration(&self, ctx: &VuContext) -> Result<Vec<Step>>;
}
