use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{ExpectedStatuses, Stage};
use crate::error::ConfigError;
use crate::report::ReportFormat;
use crate::thresholds::ThresholdEntry;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "RAMPLOAD__";
/// Single-variable override for the target, kept for parity with load
/// scripts that read `BASE_URL`.
pub const BASE_URL_ENV: &str = "BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub thresholds: BTreeMap<String, Vec<ThresholdEntry>>,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub base_url: String,
    /// Statuses that count as success for `http_req_failed`.
    pub expected_statuses: ExpectedStatuses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub stages: Vec<Stage>,
    #[serde(with = "crate::utils::duration")]
    pub request_timeout: Duration,
    #[serde(with = "crate::utils::duration")]
    pub iteration_pause: Duration,
    #[serde(with = "crate::utils::duration")]
    pub scheduler_tick: Duration,
    /// How often `abort_on_fail` thresholds are checked during the run.
    #[serde(with = "crate::utils::duration")]
    pub threshold_check_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub format: ReportFormat,
    /// Write the report here instead of stdout.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let mut thresholds = BTreeMap::new();
        thresholds.insert(
            "http_req_duration".to_string(),
            vec![ThresholdEntry::Expression("p(95)<300".to_string())],
        );
        thresholds.insert(
            "http_req_failed".to_string(),
            vec![ThresholdEntry::Expression("rate<0.001".to_string())],
        );

        Self {
            target: TargetConfig {
                base_url: "http://localhost:8080".to_string(),
                expected_statuses: ExpectedStatuses::default(),
            },
            run: RunConfig {
                stages: vec![
                    Stage::new(Duration::from_secs(30), 10),
                    Stage::new(Duration::from_secs(30), 20),
                    Stage::new(Duration::from_secs(30), 0),
                ],
                request_timeout: Duration::from_secs(60),
                iteration_pause: Duration::from_millis(200),
                scheduler_tick: Duration::from_millis(100),
                threshold_check_interval: Duration::from_secs(2),
            },
            thresholds,
            report: ReportConfig {
                format: ReportFormat::Human,
                output: None,
            },
        }
    }
}

impl Config {
    /// Resolve configuration once, before the run starts.
    ///
    /// Later sources win: built-in defaults, `config/default.toml`, the
    /// explicit `path`, `RAMPLOAD__SECTION__KEY` variables, then `BASE_URL`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(DEFAULT_CONFIG_PATH));

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&[BASE_URL_ENV])
                    .map(|_| "target.base_url".into()),
            );

        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_match_team_load_profile() {
        let cfg = Config::default();
        assert_eq!(cfg.run.stages.len(), 3);
        assert_eq!(cfg.run.stages[1], Stage::new(Duration::from_secs(30), 20));
        assert_eq!(cfg.run.iteration_pause, Duration::from_millis(200));
        assert!(cfg.thresholds.contains_key("http_req_duration"));
        assert!(cfg.thresholds.contains_key("http_req_failed"));
    }

    #[test]
    fn test_load_merges_file_and_env() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                "load.toml",
                r#"
                [target]
                base_url = "http://file:9000"

                [run]
                iteration_pause = "50ms"

                [[run.stages]]
                duration = "5s"
                target = 3

                [thresholds]
                http_req_duration = ["p(99)<800", { threshold = "avg<200", abort_on_fail = true }]
                "#,
            )?;
            jail.set_env("RAMPLOAD__RUN__REQUEST_TIMEOUT", "15s");

            let cfg = Config::load(Some(Path::new("load.toml"))).expect("config loads");
            assert_eq!(cfg.target.base_url, "http://file:9000");
            assert_eq!(cfg.run.iteration_pause, Duration::from_millis(50));
            assert_eq!(cfg.run.request_timeout, Duration::from_secs(15));
            assert_eq!(cfg.run.stages, vec![Stage::new(Duration::from_secs(5), 3)]);
            assert_eq!(cfg.thresholds["http_req_duration"].len(), 2);
            assert!(cfg.thresholds.contains_key("http_req_failed"));
            Ok(())
        });
    }

    #[test]
    fn test_base_url_env_wins() {
        Jail::expect_with(|jail| {
            jail.set_env("RAMPLOAD__TARGET__BASE_URL", "http://prefixed:1");
            jail.set_env("BASE_URL", "http://app_e2e:8080");
            let cfg = Config::load(None).expect("config loads");
            assert_eq!(cfg.target.base_url, "http://app_e2e:8080");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let err = Config::load(Some(Path::new("nope.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::MissingFile(_)));
            Ok(())
        });
    }

    #[test]
    fn test_bad_duration_is_load_error() {
        Jail::expect_with(|jail| {
            jail.set_env("RAMPLOAD__RUN__ITERATION_PAUSE", "whenever");
            let err = Config::load(None).unwrap_err();
            assert!(matches!(err, ConfigError::Load(_)));
            Ok(())
        });
    }
}
