use std::collections::HashMap;

use crate::settings::{Algorithm, SpacingMethod};
use crate::{Error, Result};

/// A note's scheduling state: interval in days and ease factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewState {
    pub interval: f64,
    pub ease: f64,
}

/// Maps a review-quality score in [0, 5] and the prior state to new state.
pub trait ScheduleAlgorithm {
    fn update(&self, prior: ReviewState, score: f64) -> ReviewState;
}

/// The SuperMemo-2.0 variant.
///
/// Scores below 3 reset the interval to one day regardless of the
/// accumulated ease; the ease floor is 1.3. Results are rounded to 4
/// decimal places so persisted metadata stays human readable and
/// reproducible under exact comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuperMemo2;

impl ScheduleAlgorithm for SuperMemo2 {
    fn update(&self, prior: ReviewState, score: f64) -> ReviewState {
        let q = 5.0 - score;
        let ease = round4(prior.ease + (0.1 - q * (0.08 + q * 0.02))).max(1.3);

        let interval = if score < 3.0 {
            1.0
        } else {
            round4((prior.interval * ease).max(1.0))
        };

        ReviewState { interval, ease }
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Registry of available algorithms: SM-2 built in, custom strategies by
/// name. A method whose selector names an unregistered strategy fails
/// explicitly rather than silently doing nothing.
pub struct AlgorithmSet {
    sm2: SuperMemo2,
    custom: HashMap<String, Box<dyn ScheduleAlgorithm>>,
}

impl AlgorithmSet {
    pub fn builtin() -> Self {
        Self {
            sm2: SuperMemo2,
            custom: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, algorithm: Box<dyn ScheduleAlgorithm>) {
        self.custom.insert(name.into(), algorithm);
    }

    pub fn for_method(&self, method: &SpacingMethod) -> Result<&dyn ScheduleAlgorithm> {
        match &method.algorithm {
            Algorithm::SuperMemo2 => Ok(&self.sm2),
            Algorithm::Custom(name) => self
                .custom
                .get(name)
                .map(|b| b.as_ref())
                .ok_or_else(|| Error::AlgorithmUnavailable(name.clone())),
        }
    }
}

impl Default for AlgorithmSet {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(interval: f64, ease: f64, score: f64) -> ReviewState {
        SuperMemo2.update(ReviewState { interval, ease }, score)
    }

    #[test]
    fn perfect_score_grows_interval_by_new_ease() {
        let next = update(1.0, 2.5, 5.0);
        assert_eq!(next.ease, 2.6);
        assert_eq!(next.interval, 2.6);
    }

    #[test]
    fn poor_score_resets_interval_to_one_day() {
        let next = update(2.6, 2.6, 1.0);
        assert_eq!(next.ease, 2.06);
        assert_eq!(next.interval, 1.0);
    }

    #[test]
    fn any_score_below_three_forces_daily_review() {
        for score in [0.0, 1.0, 2.0, 2.9] {
            let next = update(120.0, 3.4, score);
            assert_eq!(next.interval, 1.0, "score {score}");
        }
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let mut state = ReviewState {
            interval: 1.0,
            ease: 1.35,
        };
        for _ in 0..5 {
            state = SuperMemo2.update(state, 0.0);
            assert!(state.ease >= 1.3);
        }
        assert_eq!(state.ease, 1.3);
    }

    #[test]
    fn interval_never_drops_below_one_day() {
        let next = update(0.5, 1.3, 3.0);
        assert_eq!(next.interval, 1.0);
    }

    #[test]
    fn results_are_rounded_to_four_decimals() {
        // 2.6 * 2.06 = 5.356 exactly at 4 decimals.
        let next = update(2.6, 2.6, 1.0);
        assert_eq!(next.ease, 2.06);
        // score 3: ease delta is -0.14.
        let next = update(10.0, 2.5, 3.0);
        assert_eq!(next.ease, 2.36);
        assert_eq!(next.interval, 23.6);
    }

    #[test]
    fn unregistered_custom_algorithm_is_an_explicit_error() {
        let method = SpacingMethod {
            name: "scripted".into(),
            algorithm: Algorithm::Custom("my-script".into()),
            review_options: vec![crate::settings::ReviewOption {
                name: "Good".into(),
                score: 4.0,
            }],
            default_interval: 1.0,
            default_ease: None,
        };
        let set = AlgorithmSet::builtin();
        assert!(matches!(
            set.for_method(&method),
            Err(Error::AlgorithmUnavailable(name)) if name == "my-script"
        ));
    }
}
