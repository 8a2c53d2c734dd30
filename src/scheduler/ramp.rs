use std::time::Duration;

use crate::domain::Stage;
use crate::error::ConfigError;

/// Piecewise-linear VU target over the run's wall clock.
///
/// The ramp starts at 0 and each stage interpolates from the previous
/// stage's target to its own. The interpolated delta truncates toward zero,
/// so the target trails the exact line by less than one VU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ramp {
    stages: Vec<Stage>,
    total: Duration,
}

impl Ramp {
    pub fn new(stages: Vec<Stage>) -> Result<Self, ConfigError> {
        if stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        if let Some(index) = stages.iter().position(|s| s.duration.is_zero()) {
            return Err(ConfigError::ZeroDurationStage { index });
        }
        let total = stages.iter().map(|s| s.duration).sum();
        Ok(Self { stages, total })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.total
    }

    /// Highest target any stage reaches.
    pub fn peak(&self) -> u64 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Desired concurrency `elapsed` into the run. Past the end this is the
    /// final stage's target.
    pub fn target_at(&self, elapsed: Duration) -> u64 {
        let mut from = 0u64;
        let mut offset = Duration::ZERO;
        for stage in &self.stages {
            let end = offset + stage.duration;
            if elapsed < end {
                let into = (elapsed - offset).as_nanos() as i128;
                let span = stage.duration.as_nanos() as i128;
                let delta = stage.target as i128 - from as i128;
                return (from as i128 + delta * into / span) as u64;
            }
            from = stage.target;
            offset = end;
        }
        from
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn team_ramp() -> Ramp {
        Ramp::new(vec![
            Stage::new(secs(30), 10),
            Stage::new(secs(30), 20),
            Stage::new(secs(30), 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_and_zero_duration() {
        assert!(matches!(Ramp::new(vec![]), Err(ConfigError::NoStages)));
        let err = Ramp::new(vec![Stage::new(secs(1), 1), Stage::new(Duration::ZERO, 2)]);
        assert!(matches!(err, Err(ConfigError::ZeroDurationStage { index: 1 })));
    }

    #[test]
    fn test_interpolates_between_stages() {
        let ramp = team_ramp();
        assert_eq!(ramp.total_duration(), secs(90));
        assert_eq!(ramp.peak(), 20);
        assert_eq!(ramp.target_at(Duration::ZERO), 0);
        assert_eq!(ramp.target_at(secs(15)), 5);
        assert_eq!(ramp.target_at(secs(30)), 10);
        assert_eq!(ramp.target_at(secs(45)), 15);
        assert_eq!(ramp.target_at(secs(60)), 20);
        assert_eq!(ramp.target_at(secs(75)), 10);
        assert_eq!(ramp.target_at(secs(90)), 0);
        assert_eq!(ramp.target_at(secs(500)), 0);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let ramp = team_ramp();
        // 29.9s into 0 -> 10: 9.96 truncates to 9
        assert_eq!(ramp.target_at(Duration::from_millis(29_900)), 9);
        // 60.1s into 20 -> 0: 19.93 stays at 20
        assert_eq!(ramp.target_at(Duration::from_millis(60_100)), 20);
    }

    #[test]
    fn test_flat_stage_holds_target() {
        let ramp = Ramp::new(vec![Stage::new(secs(1), 4), Stage::new(secs(2), 4)]).unwrap();
        assert_eq!(ramp.target_at(Duration::from_millis(1500)), 4);
        assert_eq!(ramp.target_at(secs(10)), 4);
    }

    proptest! {
        #[test]
        fn prop_target_stays_within_stage_bounds(
            targets in prop::collection::vec(0u64..200, 1..6),
            durations_ms in prop::collection::vec(1u64..10_000, 6),
            at_ms in 0u64..60_000,
        ) {
            let stages: Vec<Stage> = targets
                .iter()
                .zip(&durations_ms)
                .map(|(t, d)| Stage::new(Duration::from_millis(*d), *t))
                .collect();
            let ramp = Ramp::new(stages.clone()).unwrap();
            let target = ramp.target_at(Duration::from_millis(at_ms));

            let mut from = 0;
            let mut offset = 0;
            let mut bounded = false;
            for stage in &stages {
                let end = offset + stage.duration.as_millis() as u64;
                if at_ms < end {
                    let (lo, hi) = (from.min(stage.target), from.max(stage.target));
                    prop_assert!(target >= lo && target <= hi);
                    bounded = true;
                    break;
                }
                from = stage.target;
                offset = end;
            }
            if !bounded {
                prop_assert_eq!(target, stages.last().unwrap().target);
            }
        }

        #[test]
        fn prop_stage_boundaries_hit_targets(
            targets in prop::collection::vec(0u64..200, 1..6),
        ) {
            let stages: Vec<Stage> = targets.iter().map(|t| Stage::new(secs(10), *t)).collect();
            let ramp = Ramp::new(stages).unwrap();
            for (i, t) in targets.iter().enumerate() {
                prop_assert_eq!(ramp.target_at(secs(10 * (i as u64 + 1))), *t);
            }
        }
    }
}
