use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One segment of the virtual-user ramp.
///
/// Over `duration` the desired number of concurrent VUs moves linearly from
/// the previous stage's target (0 for the first stage) to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(with = "crate::utils::duration")]
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    pub fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }
}
