pub mod http;

use async_trait::async_trait;

use crate::domain::{Outcome, RequestDescriptor};

pub use http::HttpExecutor;

/// Performs one request and reports what happened.
///
/// Implementations never retry and never return `Err`: transport failures
/// are part of the [`Outcome`].
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: &RequestDescriptor) -> Outcome;
}
