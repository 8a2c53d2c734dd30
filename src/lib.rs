pub mod checks;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod scheduler;
pub mod telemetry;
pub mod thresholds;
pub mod utils;

pub use config::Config;
pub use error::ConfigError;
pub use report::{ExitStatus, RunReport};
pub use runner::Runner;
