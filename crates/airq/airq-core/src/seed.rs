//! Per-run random generator

use airq_spi::SeedPolicy;
use chrono::{NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Seed value a policy yields for a run at `at`.
pub fn run_seed(policy: SeedPolicy, at: NaiveDateTime) -> u64 {
    match policy {
        SeedPolicy::MinuteOfHour => u64::from(at.minute()),
        SeedPolicy::Fixed(seed) => seed,
    }
}

/// Generator for one forecast run.
///
/// Under [`SeedPolicy::MinuteOfHour`] two runs in the same clock minute draw
/// the same sequence.
pub fn run_rng(policy: SeedPolicy, at: NaiveDateTime) -> StdRng {
    StdRng::seed_from_u64(run_seed(policy, at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use airq_spi::Observation;
    use rand::Rng;

    fn at(raw: &str) -> NaiveDateTime {
        Observation::parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_minute_policy_uses_minute() {
        assert_eq!(run_seed(SeedPolicy::MinuteOfHour, at("2024-01-01 13:42:59")), 42);
        assert_eq!(run_seed(SeedPolicy::MinuteOfHour, at("2024-01-01 00:00:00")), 0);
    }

    #[test]
    fn test_fixed_policy_ignores_clock() {
        assert_eq!(run_seed(SeedPolicy::Fixed(7), at("2024-01-01 13:42:59")), 7);
    }

    #[test]
    fn test_same_minute_same_draws() {
        let mut a = run_rng(SeedPolicy::MinuteOfHour, at("2024-01-01 13:42:01"));
        let mut b = run_rng(SeedPolicy::MinuteOfHour, at("2024-05-09 07:42:58"));
        let xs: Vec<f64> = (0..5).map(|_| a.gen()).collect();
        let ys: Vec<f64> = (0..5).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_different_minutes_differ() {
        let mut a = run_rng(SeedPolicy::MinuteOfHour, at("2024-01-01 13:42:00"));
        let mut b = run_rng(SeedPolicy::MinuteOfHour, at("2024-01-01 13:43:00"));
        let x: f64 = a.gen();
        let y: f64 = b.gen();
        assert_ne!(x, y);
    }
}
