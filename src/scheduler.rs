//! Decides when a puzzle must next be shown.
//!
//! The scheduler owns no state. Given what is known about a puzzle and the
//! outcome of the latest attempt it returns the new score and how many days
//! to wait before the next review. Two policies are available:
//!
//! - [`FibonacciPolicy`]: a pass moves the score up by one and waits
//!   `fib(score)` days, a fail resets to tomorrow. This is the default.
//! - [`Sm2Policy`]: the SuperMemo-2 variant with a floating easiness factor
//!   and hard caps on the interval.

pub const MAX_SUCCESS: u32 = 4;
pub const MAX_INTERVAL: u32 = 60;
pub const BASE_INTERVAL: u32 = 6;
pub const MIN_EASINESS: f64 = 1.3;
pub const DEFAULT_EASINESS: f64 = 2.5;

/// Graded recall quality (0-5) that a pass or fail stands for under SM2.
const PASS_QUALITY: f64 = 4.0;
const FAIL_QUALITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub score: u32,
    pub day_offset: u32,
}

/// The per-puzzle inputs a policy works from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleState {
    /// Consecutive successful reviews.
    pub score: u32,
    /// Days between the previous review and the one it scheduled.
    pub interval_days: u32,
    pub easiness: f64,
}

impl ScheduleState {
    pub fn new(score: u32) -> Self {
        ScheduleState {
            score,
            interval_days: 0,
            easiness: DEFAULT_EASINESS,
        }
    }
}

impl Default for ScheduleState {
    fn default() -> Self {
        ScheduleState::new(0)
    }
}

pub trait SchedulingPolicy {
    /// Maps the prior state and an outcome to the next state. The returned
    /// `interval_days` is the offset from today of the next review.
    fn transition(&self, prior: &ScheduleState, outcome: Outcome) -> ScheduleState;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FibonacciPolicy;

impl SchedulingPolicy for FibonacciPolicy {
    fn transition(&self, prior: &ScheduleState, outcome: Outcome) -> ScheduleState {
        let next = transition(prior.score, outcome);
        ScheduleState {
            score: next.score,
            interval_days: next.day_offset,
            easiness: prior.easiness,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sm2Policy;

impl SchedulingPolicy for Sm2Policy {
    fn transition(&self, prior: &ScheduleState, outcome: Outcome) -> ScheduleState {
        let (quality, score, interval_days) = match outcome {
            Outcome::Pass => {
                let interval = if prior.score > MAX_SUCCESS {
                    MAX_INTERVAL
                } else if prior.score == 0 {
                    1
                } else if prior.score == 1 {
                    BASE_INTERVAL
                } else {
                    let grown = (f64::from(prior.interval_days) * prior.easiness).round();
                    grown.min(f64::from(MAX_INTERVAL)).max(1.0) as u32
                };
                (PASS_QUALITY, prior.score.saturating_add(1), interval)
            }
            Outcome::Fail => (FAIL_QUALITY, 0, 1),
        };

        let lapse = 5.0 - quality;
        let easiness = (prior.easiness + (0.1 - lapse * (0.08 + lapse * 0.02))).max(MIN_EASINESS);

        ScheduleState {
            score,
            interval_days,
            easiness,
        }
    }
}

/// Selects a [`SchedulingPolicy`] by name, from config or the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Fibonacci,
    Sm2,
}

impl PolicyKind {
    pub fn policy(self) -> Box<dyn SchedulingPolicy> {
        match self {
            PolicyKind::Fibonacci => Box::new(FibonacciPolicy),
            PolicyKind::Sm2 => Box::new(Sm2Policy),
        }
    }
}

/// The Fibonacci rule: a fail resets the score and reviews again tomorrow,
/// a pass bumps the score and waits `fib(new score)` days.
pub fn transition(score: u32, outcome: Outcome) -> Transition {
    match outcome {
        Outcome::Fail => Transition {
            score: 0,
            day_offset: 1,
        },
        Outcome::Pass => {
            let score = score.saturating_add(1);
            Transition {
                score,
                day_offset: fib(score),
            }
        }
    }
}

/// Fibonacci indexed so that `fib(0) = fib(1) = 1`, giving 1, 1, 2, 3, 5, 8...
/// Saturates at `u32::MAX`.
pub fn fib(n: u32) -> u32 {
    let (mut a, mut b) = (0u32, 1u32);
    for _ in 0..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

/// The calendar date `day_offset` days after `today`.
pub fn due_date(today: NaiveDate, day_offset: u32) -> NaiveDate {
    today
        .checked_add_days(Days::new(u64::from(day_offset)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fib_starts_at_one_one() {
        let firsts: Vec<u32> = (0..8).map(fib).collect();
        assert_eq!(firsts, vec![1, 1, 2, 3, 5, 8, 13, 21]);
    }

    #[test]
    fn fib_saturates() {
        assert_eq!(fib(200), u32::MAX);
    }

    #[test]
    fn fail_always_resets_to_tomorrow() {
        for score in [0, 1, 2, 7, 40, u32::MAX] {
            assert_eq!(
                transition(score, Outcome::Fail),
                Transition {
                    score: 0,
                    day_offset: 1
                }
            );
        }
    }

    #[test]
    fn pass_grows_by_fibonacci() {
        for score in 0..20 {
            let next = transition(score, Outcome::Pass);
            assert_eq!(next.score, score + 1);
            assert_eq!(next.day_offset, fib(score + 1));
        }
        assert_eq!(transition(2, Outcome::Pass).day_offset, 3);
        assert_eq!(transition(4, Outcome::Pass).day_offset, 8);
    }

    #[test]
    fn due_date_rolls_over_months_and_years() {
        assert_eq!(due_date(date(2024, 1, 31), 1), date(2024, 2, 1));
        assert_eq!(due_date(date(2024, 2, 28), 1), date(2024, 2, 29));
        assert_eq!(due_date(date(2023, 2, 28), 1), date(2023, 3, 1));
        assert_eq!(due_date(date(2023, 12, 31), 1), date(2024, 1, 1));
        assert_eq!(due_date(date(2024, 12, 20), 13), date(2025, 1, 2));
        assert_eq!(due_date(date(2024, 3, 9), 0), date(2024, 3, 9));
    }

    #[test]
    fn due_date_saturates_at_max() {
        assert_eq!(due_date(NaiveDate::MAX, 1), NaiveDate::MAX);
    }

    #[test]
    fn fibonacci_policy_keeps_easiness() {
        let prior = ScheduleState {
            score: 2,
            interval_days: 2,
            easiness: 1.7,
        };
        let next = FibonacciPolicy.transition(&prior, Outcome::Pass);
        assert_eq!(next.score, 3);
        assert_eq!(next.interval_days, 3);
        assert_eq!(next.easiness, 1.7);
    }

    #[test]
    fn sm2_first_passes_use_fixed_intervals() {
        let first = Sm2Policy.transition(&ScheduleState::default(), Outcome::Pass);
        assert_eq!((first.score, first.interval_days), (1, 1));
        let second = Sm2Policy.transition(&first, Outcome::Pass);
        assert_eq!((second.score, second.interval_days), (2, BASE_INTERVAL));
        let third = Sm2Policy.transition(&second, Outcome::Pass);
        assert_eq!(third.score, 3);
        // 6 * 2.5
        assert_eq!(third.interval_days, 15);
    }

    #[test]
    fn sm2_caps_interval() {
        let prior = ScheduleState {
            score: 3,
            interval_days: 40,
            easiness: 2.5,
        };
        assert_eq!(
            Sm2Policy.transition(&prior, Outcome::Pass).interval_days,
            MAX_INTERVAL
        );

        let veteran = ScheduleState {
            score: MAX_SUCCESS + 1,
            interval_days: 2,
            easiness: MIN_EASINESS,
        };
        assert_eq!(
            Sm2Policy.transition(&veteran, Outcome::Pass).interval_days,
            MAX_INTERVAL
        );
    }

    #[test]
    fn sm2_fail_resets_and_lowers_easiness() {
        let prior = ScheduleState {
            score: 3,
            interval_days: 15,
            easiness: 2.5,
        };
        let next = Sm2Policy.transition(&prior, Outcome::Fail);
        assert_eq!((next.score, next.interval_days), (0, 1));
        assert!(next.easiness < prior.easiness);
    }

    #[test]
    fn sm2_easiness_has_a_floor() {
        let mut state = ScheduleState::default();
        for _ in 0..20 {
            state = Sm2Policy.transition(&state, Outcome::Fail);
        }
        assert_eq!(state.easiness, MIN_EASINESS);
    }

    #[test]
    fn policy_kind_defaults_to_fibonacci() {
        let prior = ScheduleState::new(2);
        let next = PolicyKind::default()
            .policy()
            .transition(&prior, Outcome::Pass);
        assert_eq!(next.interval_days, fib(3));
    }
}

use crate::results::Outcome;
use chrono::{Days, NaiveDate};
use clap::ValueEnum;
use serde::Deserialize;
