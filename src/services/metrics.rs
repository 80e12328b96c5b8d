//! Derived learner metrics: velocity, time spent, consistency, retention, progress.
//!
//! Every function here accepts empty input and returns a zero value.

use std::collections::BTreeSet;

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Trailing window for learning velocity.
pub const VELOCITY_WINDOW_DAYS: i64 = 7;

/// Upper bound on the consistency window.
pub const CONSISTENCY_WINDOW_DAYS: u32 = 30;

/// Analytics block of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningAnalytics {
    pub learning_velocity: u32,
    pub total_time_spent_ms: i64,
    pub consistency_score: u8,
    pub consistency_label: ConsistencyBand,
    pub retention_rate: u8,
    pub total_days: u32,
}

impl Default for LearningAnalytics {
    fn default() -> Self {
        Self {
            learning_velocity: 0,
            total_time_spent_ms: 0,
            consistency_score: 0,
            consistency_label: ConsistencyBand::NeedsImprovement,
            retention_rate: 0,
            total_days: 1,
        }
    }
}

/// UI band for a consistency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyBand {
    Excellent,
    Good,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl ConsistencyBand {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            Self::Excellent
        } else if score >= 60 {
            Self::Good
        } else {
            Self::NeedsImprovement
        }
    }
}

impl std::fmt::Display for ConsistencyBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "Excellent"),
            Self::Good => write!(f, "Good"),
            Self::NeedsImprovement => write!(f, "Needs Improvement"),
        }
    }
}

/// Number of completions with `now - 7d <= completed_at <= now`.
pub fn learning_velocity<I>(completions: I, now: DateTime<Utc>) -> u32
where
    I: IntoIterator<Item = Option<DateTime<Utc>>>,
{
    let window_start = now - Duration::days(VELOCITY_WINDOW_DAYS);
    let count = completions
        .into_iter()
        .flatten()
        .filter(|ts| *ts >= window_start && *ts <= now)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Sum of recorded lesson durations in milliseconds. Missing or negative values count as 0.
pub fn total_time_spent_ms<I>(durations: I) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    durations
        .into_iter()
        .flatten()
        .filter(|ms| *ms > 0)
        .fold(0i64, |acc, ms| acc.saturating_add(ms))
}

/// Days considered for the consistency score: calendar days since the first
/// enrollment (inclusive of today), between 1 and [`CONSISTENCY_WINDOW_DAYS`].
pub fn consistency_window_days(first_enrollment: Option<DateTime<Utc>>, today: NaiveDate) -> u32 {
    let Some(started) = first_enrollment else {
        return 1;
    };
    let elapsed = (today - started.date_naive()).num_days() + 1;
    u32::try_from(elapsed.clamp(1, i64::from(CONSISTENCY_WINDOW_DAYS))).unwrap_or(1)
}

/// Percentage of days in the window ending today that had at least one completion.
pub fn consistency_score(days: &BTreeSet<NaiveDate>, window_days: u32, today: NaiveDate) -> u8 {
    let window_days = window_days.max(1);
    let Some(window_start) = today.checked_sub_days(Days::new(u64::from(window_days - 1))) else {
        return 0;
    };
    let active = days.range(window_start..=today).count();
    percentage(active as u64, u64::from(window_days))
}

/// Share of passed quiz attempts.
pub fn retention_rate<I>(outcomes: I) -> u8
where
    I: IntoIterator<Item = bool>,
{
    let (passed, total) = outcomes
        .into_iter()
        .fold((0u64, 0u64), |(p, t), ok| (p + u64::from(ok), t + 1));
    percentage(passed, total)
}

/// A track is complete once every one of its lessons is.
pub fn is_track_complete(completed_lessons: i64, total_lessons: i64) -> bool {
    total_lessons > 0 && completed_lessons >= total_lessons
}

/// Track completion derived from lesson counts. This is the source of truth
/// for `Enrollment::progress_pct`. Only a complete track reports 100.
pub fn derive_progress_pct(completed_lessons: i64, total_lessons: i64) -> i32 {
    if total_lessons <= 0 || completed_lessons <= 0 {
        return 0;
    }
    if is_track_complete(completed_lessons, total_lessons) {
        return 100;
    }
    let pct = (completed_lessons as f64 / total_lessons as f64 * 100.0).round();
    pct.clamp(0.0, 99.0) as i32
}

/// `round(part / whole * 100)` clamped to 0..=100, with 0 for an empty whole.
fn percentage(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        now().date_naive()
    }

    fn day(n: u64) -> NaiveDate {
        today().checked_sub_days(Days::new(n)).unwrap()
    }

    // -- Velocity --

    #[test]
    fn velocity_counts_trailing_week() {
        let completions = vec![
            Some(now() - Duration::hours(1)),
            Some(now() - Duration::days(3)),
            Some(now() - Duration::days(7)),
            Some(now() - Duration::days(8)),
            None,
        ];
        assert_eq!(learning_velocity(completions, now()), 3);
    }

    #[test]
    fn velocity_excludes_eight_day_old_completion() {
        assert_eq!(learning_velocity([Some(now() - Duration::days(8))], now()), 0);
    }

    #[test]
    fn velocity_excludes_future_completion() {
        assert_eq!(learning_velocity([Some(now() + Duration::minutes(5))], now()), 0);
    }

    #[test]
    fn velocity_empty_is_zero() {
        assert_eq!(learning_velocity(Vec::new(), now()), 0);
    }

    // -- Time spent --

    #[test]
    fn time_spent_sums_known_durations() {
        assert_eq!(total_time_spent_ms([Some(1_000), None, Some(2_500)]), 3_500);
    }

    #[test]
    fn time_spent_ignores_negative_values() {
        assert_eq!(total_time_spent_ms([Some(-50), Some(10)]), 10);
        assert_eq!(total_time_spent_ms(Vec::new()), 0);
    }

    // -- Consistency --

    #[test]
    fn window_defaults_to_one_without_enrollments() {
        assert_eq!(consistency_window_days(None, today()), 1);
    }

    #[test]
    fn window_counts_enrollment_day() {
        assert_eq!(consistency_window_days(Some(now()), today()), 1);
        assert_eq!(consistency_window_days(Some(now() - Duration::days(9)), today()), 10);
    }

    #[test]
    fn window_caps_at_thirty() {
        assert_eq!(consistency_window_days(Some(now() - Duration::days(200)), today()), 30);
    }

    #[test]
    fn consistency_is_zero_without_activity() {
        assert_eq!(consistency_score(&BTreeSet::new(), 30, today()), 0);
        assert_eq!(consistency_score(&BTreeSet::new(), 1, today()), 0);
    }

    #[test]
    fn consistency_rounds_share_of_active_days() {
        let days: BTreeSet<_> = (0..20).map(day).collect();
        assert_eq!(consistency_score(&days, 30, today()), 67);
    }

    #[test]
    fn consistency_ignores_days_outside_window() {
        let days: BTreeSet<_> = [day(0), day(1), day(12), day(40)].into_iter().collect();
        assert_eq!(consistency_score(&days, 10, today()), 20);
    }

    #[test]
    fn consistency_never_exceeds_hundred() {
        let days: BTreeSet<_> = (0..30).map(day).collect();
        for window in [0, 1, 5, 30] {
            let score = consistency_score(&days, window, today());
            assert!(score <= 100);
        }
        assert_eq!(consistency_score(&days, 30, today()), 100);
    }

    #[test]
    fn consistency_bands() {
        assert_eq!(ConsistencyBand::from_score(100), ConsistencyBand::Excellent);
        assert_eq!(ConsistencyBand::from_score(80), ConsistencyBand::Excellent);
        assert_eq!(ConsistencyBand::from_score(79), ConsistencyBand::Good);
        assert_eq!(ConsistencyBand::from_score(60), ConsistencyBand::Good);
        assert_eq!(ConsistencyBand::from_score(59), ConsistencyBand::NeedsImprovement);
        assert_eq!(ConsistencyBand::NeedsImprovement.to_string(), "Needs Improvement");
    }

    // -- Retention --

    #[test]
    fn retention_is_share_of_passed_attempts() {
        assert_eq!(retention_rate([true, true, false]), 67);
        assert_eq!(retention_rate([true]), 100);
    }

    #[test]
    fn retention_without_attempts_is_zero() {
        assert_eq!(retention_rate(Vec::new()), 0);
    }

    // -- Progress --

    #[test]
    fn progress_four_of_ten_is_forty() {
        assert_eq!(derive_progress_pct(4, 10), 40);
    }

    #[test]
    fn progress_rounds_and_clamps() {
        assert_eq!(derive_progress_pct(1, 3), 33);
        assert_eq!(derive_progress_pct(2, 3), 67);
        assert_eq!(derive_progress_pct(12, 10), 100);
    }

    #[test]
    fn progress_stays_below_hundred_until_last_lesson() {
        assert_eq!(derive_progress_pct(199, 200), 99);
        assert!(!is_track_complete(199, 200));
        assert_eq!(derive_progress_pct(200, 200), 100);
        assert!(is_track_complete(200, 200));
    }

    #[test]
    fn empty_track_is_never_complete() {
        assert!(!is_track_complete(0, 0));
    }

    #[test]
    fn progress_of_empty_track_is_zero() {
        assert_eq!(derive_progress_pct(0, 0), 0);
        assert_eq!(derive_progress_pct(3, 0), 0);
    }
}
