//! Consecutive-day learning streak.
//!
//! Completion timestamps are bucketed by UTC calendar day. The streak counts
//! days with at least one completion, walking backward from `today`, and stops
//! at the first day without activity or after [`MAX_STREAK_DAYS`].

use std::collections::BTreeSet;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Hard cap on the reported streak.
pub const MAX_STREAK_DAYS: u32 = 30;

/// Streak view-model consumed by the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakInfo {
    pub streak: u32,
}

/// Collapse completion timestamps into the set of distinct UTC days.
///
/// Rows without a completion time are skipped.
pub fn activity_days<I>(completions: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = Option<DateTime<Utc>>>,
{
    completions
        .into_iter()
        .flatten()
        .map(|ts| ts.date_naive())
        .collect()
}

/// Count consecutive active days ending at `today`.
pub fn calculate_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    for offset in 0..MAX_STREAK_DAYS {
        let Some(day) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            break;
        };
        if !days.contains(&day) {
            break;
        }
        streak += 1;
    }
    streak
}
