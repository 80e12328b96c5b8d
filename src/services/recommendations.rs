//! Recommendation priority scoring for tracks the learner has not enrolled in.
//!
//! Rules, first match wins:
//! - published within 7 days: high, "Recently Added"
//! - published within 30 days: medium, "New Course"
//! - beginner keyword in title or description: medium, "Popular Choice"
//! - otherwise: low, "Recommended for You"

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::track::RecommendationCandidate;

/// Maximum number of recommendations returned.
pub const MAX_RECOMMENDATIONS: usize = 6;

const RECENT_DAYS: i64 = 7;
const NEW_DAYS: i64 = 30;

/// Lowercase keywords that mark a track as approachable for new learners.
pub const BEGINNER_KEYWORDS: [&str; 5] = [
    "beginner",
    "introduction",
    "fundamentals",
    "basics",
    "getting started",
];

/// Priority tag. Ordering is `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub title: String,
    pub reason: String,
    pub priority: Priority,
}

/// Assign a priority and reason to one candidate.
pub fn score(candidate: &RecommendationCandidate, now: DateTime<Utc>) -> (Priority, &'static str) {
    let published = candidate.published_at.unwrap_or(candidate.created_at);
    let age = now.signed_duration_since(published);

    if age <= Duration::days(RECENT_DAYS) {
        return (Priority::High, "Recently Added");
    }
    if age <= Duration::days(NEW_DAYS) {
        return (Priority::Medium, "New Course");
    }
    if mentions_beginner_keyword(candidate) {
        return (Priority::Medium, "Popular Choice");
    }
    (Priority::Low, "Recommended for You")
}

fn mentions_beginner_keyword(candidate: &RecommendationCandidate) -> bool {
    let title = candidate.title.to_lowercase();
    let description = candidate
        .description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    BEGINNER_KEYWORDS
        .iter()
        .any(|kw| title.contains(kw) || description.contains(kw))
}

/// Score candidates the user is not enrolled in, order by priority (stable
/// within a tier) and keep the top [`MAX_RECOMMENDATIONS`].
pub fn recommend(
    candidates: &[RecommendationCandidate],
    enrolled_track_ids: &HashSet<Uuid>,
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut scored: Vec<Recommendation> = candidates
        .iter()
        .filter(|c| !enrolled_track_ids.contains(&c.id))
        .map(|c| {
            let (priority, reason) = score(c, now);
            Recommendation {
                id: c.id,
                title: c.title.clone(),
                reason: reason.to_string(),
                priority,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.priority.cmp(&a.priority));
    scored.truncate(MAX_RECOMMENDATIONS);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn candidate(title: &str, description: Option<&str>, age_days: i64) -> RecommendationCandidate {
        let published = now() - Duration::days(age_days);
        RecommendationCandidate {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.map(str::to_string),
            published_at: Some(published),
            created_at: published,
        }
    }

    #[test]
    fn recent_track_is_high() {
        let c = candidate("Advanced Spreads", None, 2);
        assert_eq!(score(&c, now()), (Priority::High, "Recently Added"));
    }

    #[test]
    fn month_old_track_is_new_course() {
        let c = candidate("Advanced Spreads", None, 20);
        assert_eq!(score(&c, now()), (Priority::Medium, "New Course"));
    }

    #[test]
    fn recency_wins_over_keyword() {
        let c = candidate("Trading Basics", None, 1);
        assert_eq!(score(&c, now()).0, Priority::High);
    }

    #[test]
    fn beginner_keyword_in_description_is_popular() {
        let c = candidate("Price Action", Some("A Getting Started guide to charts"), 90);
        assert_eq!(score(&c, now()), (Priority::Medium, "Popular Choice"));
    }

    #[test]
    fn beginner_keyword_matches_case_insensitively() {
        let c = candidate("FUNDAMENTALS of Risk", None, 90);
        assert_eq!(score(&c, now()).1, "Popular Choice");
    }

    #[test]
    fn old_plain_track_is_low() {
        let c = candidate("Volatility Surfaces", Some("Deep dive"), 120);
        assert_eq!(score(&c, now()), (Priority::Low, "Recommended for You"));
    }

    #[test]
    fn unpublished_date_falls_back_to_created_at() {
        let mut c = candidate("Volatility Surfaces", None, 120);
        c.published_at = None;
        c.created_at = now() - Duration::days(3);
        assert_eq!(score(&c, now()).0, Priority::High);
    }

    #[test]
    fn enrolled_tracks_are_excluded() {
        let a = candidate("Track A", None, 1);
        let b = candidate("Track B", None, 1);
        let enrolled: HashSet<Uuid> = [a.id].into_iter().collect();

        let result = recommend(&[a, b.clone()], &enrolled, now());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, b.id);
    }

    #[test]
    fn sorted_by_priority_and_stable_within_tier() {
        let low1 = candidate("Low One", None, 200);
        let high = candidate("High", None, 1);
        let low2 = candidate("Low Two", None, 300);
        let medium = candidate("Medium", None, 15);

        let result = recommend(
            &[low1.clone(), high.clone(), low2.clone(), medium.clone()],
            &HashSet::new(),
            now(),
        );
        let ids: Vec<Uuid> = result.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![high.id, medium.id, low1.id, low2.id]);
    }

    #[test]
    fn capped_at_six_and_low_never_precedes_higher() {
        let mut candidates: Vec<_> = (0..8).map(|i| candidate(&format!("Old {i}"), None, 400)).collect();
        candidates.push(candidate("Fresh", None, 0));
        candidates.push(candidate("Intro", Some("introduction"), 400));

        let result = recommend(&candidates, &HashSet::new(), now());
        assert_eq!(result.len(), MAX_RECOMMENDATIONS);
        assert_eq!(result[0].priority, Priority::High);
        assert_eq!(result[1].priority, Priority::Medium);
        assert!(result.windows(2).all(|w| w[0].priority >= w[1].priority));
    }

    #[test]
    fn no_candidates_no_recommendations() {
        assert!(recommend(&[], &HashSet::new(), now()).is_empty());
    }

    #[test]
    fn priority_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), "\"medium\"");
    }
}
