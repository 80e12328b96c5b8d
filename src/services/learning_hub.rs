//! Learner dashboard aggregation.
//!
//! Fetches a learner's raw rows concurrently, then reduces them with the pure
//! functions in `streak`, `metrics` and `recommendations`. A failing sub-fetch
//! degrades to an empty collection so one broken query never blanks the
//! whole dashboard.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::learning::{CertificateWithTrack, QuizAttempt};
use crate::models::track::RecommendationCandidate;
use crate::services::cache::DashboardCache;
use crate::services::certificate;
use crate::services::metrics::{self, ConsistencyBand, LearningAnalytics, CONSISTENCY_WINDOW_DAYS};
use crate::services::recommendations::{self, Recommendation};
use crate::services::streak::{self, StreakInfo};

/// Entries kept in the recent activity feed.
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Headline counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerStats {
    pub streak: u32,
    pub total_enrollments: usize,
    pub completed_tracks: usize,
    pub lessons_completed: usize,
    pub certificates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TrackStatus {
    pub fn from_counts(completed_lessons: i64, total_lessons: i64) -> Self {
        if metrics::is_track_complete(completed_lessons, total_lessons) {
            Self::Completed
        } else if completed_lessons > 0 {
            Self::InProgress
        } else {
            Self::NotStarted
        }
    }
}

/// One enrolled track as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackProgressCard {
    pub track_id: Uuid,
    pub slug: String,
    pub title: String,
    pub progress_pct: i32,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: TrackStatus,
}

/// A completed lesson in the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub track_id: Uuid,
    pub track_title: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningHubDashboard {
    pub stats: LearnerStats,
    pub analytics: LearningAnalytics,
    pub streak: StreakInfo,
    pub tracks: Vec<TrackProgressCard>,
    pub recent_activity: Vec<ActivityItem>,
    pub certificates: Vec<CertificateWithTrack>,
    pub recommendations: Vec<Recommendation>,
}

/// Enrollment joined with its track and lesson counts.
#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentRow {
    pub track_id: Uuid,
    pub slug: String,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_lessons: i64,
    pub total_lessons: i64,
}

/// Lesson progress joined with lesson and track titles.
#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub track_id: Uuid,
    pub track_title: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_ms: Option<i64>,
}

/// Everything the dashboard is computed from.
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    pub enrollments: Vec<EnrollmentRow>,
    pub progress: Vec<ProgressRow>,
    pub certificates: Vec<CertificateWithTrack>,
    /// Completion timestamps inside the consistency window.
    pub recent_completions: Vec<Option<DateTime<Utc>>>,
    /// Pass/fail outcome of each quiz attempt.
    pub quiz_outcomes: Vec<bool>,
    pub candidates: Vec<RecommendationCandidate>,
}

/// Reduce raw rows into the dashboard view.
pub fn assemble(inputs: DashboardInputs, now: DateTime<Utc>) -> LearningHubDashboard {
    let today = now.date_naive();

    let active_days = streak::activity_days(inputs.recent_completions.iter().copied());
    let streak = StreakInfo {
        streak: streak::calculate_streak(&active_days, today),
    };

    let first_enrollment = inputs.enrollments.iter().map(|e| e.started_at).min();
    let window_days = metrics::consistency_window_days(first_enrollment, today);
    let consistency_score = metrics::consistency_score(&active_days, window_days, today);
    let analytics = LearningAnalytics {
        learning_velocity: metrics::learning_velocity(
            inputs.progress.iter().map(|p| p.completed_at),
            now,
        ),
        total_time_spent_ms: metrics::total_time_spent_ms(
            inputs.progress.iter().map(|p| p.time_spent_ms),
        ),
        consistency_score,
        consistency_label: ConsistencyBand::from_score(consistency_score),
        retention_rate: metrics::retention_rate(inputs.quiz_outcomes.iter().copied()),
        total_days: window_days,
    };

    let tracks: Vec<TrackProgressCard> = inputs.enrollments.iter().map(progress_card).collect();

    let stats = LearnerStats {
        streak: streak.streak,
        total_enrollments: inputs.enrollments.len(),
        completed_tracks: tracks
            .iter()
            .filter(|t| t.status == TrackStatus::Completed)
            .count(),
        lessons_completed: inputs
            .progress
            .iter()
            .filter(|p| p.completed_at.is_some())
            .count(),
        certificates: inputs.certificates.len(),
    };

    let enrolled: HashSet<Uuid> = inputs.enrollments.iter().map(|e| e.track_id).collect();
    let recommendations = recommendations::recommend(&inputs.candidates, &enrolled, now);

    LearningHubDashboard {
        stats,
        analytics,
        streak,
        tracks,
        recent_activity: recent_activity(&inputs.progress),
        certificates: inputs.certificates,
        recommendations,
    }
}

fn progress_card(row: &EnrollmentRow) -> TrackProgressCard {
    let progress_pct = metrics::derive_progress_pct(row.completed_lessons, row.total_lessons);
    TrackProgressCard {
        track_id: row.track_id,
        slug: row.slug.clone(),
        title: row.title.clone(),
        progress_pct,
        completed_lessons: row.completed_lessons,
        total_lessons: row.total_lessons,
        started_at: row.started_at,
        completed_at: row.completed_at,
        status: TrackStatus::from_counts(row.completed_lessons, row.total_lessons),
    }
}

/// Latest completions first, capped at [`RECENT_ACTIVITY_LIMIT`].
fn recent_activity(progress: &[ProgressRow]) -> Vec<ActivityItem> {
    let mut items: Vec<ActivityItem> = progress
        .iter()
        .filter_map(|p| {
            p.completed_at.map(|completed_at| ActivityItem {
                lesson_id: p.lesson_id,
                lesson_title: p.lesson_title.clone(),
                track_id: p.track_id,
                track_title: p.track_title.clone(),
                completed_at,
            })
        })
        .collect();
    items.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    items.truncate(RECENT_ACTIVITY_LIMIT);
    items
}

/// Load the dashboard, serving from cache when possible.
pub async fn get_dashboard(
    pool: &PgPool,
    cache: &DashboardCache,
    user_id: Uuid,
) -> Result<LearningHubDashboard, AppError> {
    let slot = cache.slot(user_id).await;
    if let Some(slot) = &slot {
        if let Some(cached) = cache.get::<LearningHubDashboard>(slot).await {
            tracing::debug!(%user_id, "Dashboard cache hit");
            return Ok(cached);
        }
    }

    let now = Utc::now();
    let FetchedInputs { inputs, degraded } = fetch_inputs(pool, user_id, now).await;
    let dashboard = assemble(inputs, now);
    match &slot {
        Some(slot) if !degraded => cache.put(slot, &dashboard).await,
        Some(_) => tracing::debug!(%user_id, "Skipping cache write for degraded dashboard"),
        None => {}
    }

    tracing::debug!(
        %user_id,
        enrollments = dashboard.stats.total_enrollments,
        streak = dashboard.streak.streak,
        degraded,
        "Dashboard assembled"
    );
    Ok(dashboard)
}

/// Dashboard inputs plus whether any source fell back to an empty result.
#[derive(Debug, Default)]
pub struct FetchedInputs {
    pub inputs: DashboardInputs,
    pub degraded: bool,
}

/// Run every sub-fetch concurrently. Failures are logged and replaced by empty input.
pub async fn fetch_inputs(pool: &PgPool, user_id: Uuid, now: DateTime<Utc>) -> FetchedInputs {
    let since = now - Duration::days(i64::from(CONSISTENCY_WINDOW_DAYS));
    let (enrollments, progress, certificates, recent_completions, quiz_outcomes, candidates) = tokio::join!(
        fetch_enrollments(pool, user_id),
        fetch_progress(pool, user_id),
        certificate::list_for_user(pool, user_id),
        fetch_completions_since(pool, user_id, since),
        fetch_quiz_outcomes(pool, user_id),
        fetch_candidates(pool, user_id),
    );

    let mut degraded = false;
    let inputs = DashboardInputs {
        enrollments: or_empty(enrollments, "enrollments", user_id, &mut degraded),
        progress: or_empty(progress, "lesson progress", user_id, &mut degraded),
        certificates: or_empty(certificates, "certificates", user_id, &mut degraded),
        recent_completions: or_empty(
            recent_completions,
            "recent completions",
            user_id,
            &mut degraded,
        ),
        quiz_outcomes: or_empty(quiz_outcomes, "quiz attempts", user_id, &mut degraded),
        candidates: or_empty(candidates, "recommendation candidates", user_id, &mut degraded),
    };
    FetchedInputs { inputs, degraded }
}

fn or_empty<T>(
    result: Result<Vec<T>, AppError>,
    source: &str,
    user_id: Uuid,
    degraded: &mut bool,
) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, %user_id, source, "Dashboard fetch failed, using empty result");
        *degraded = true;
        Vec::new()
    })
}

async fn fetch_enrollments(pool: &PgPool, user_id: Uuid) -> Result<Vec<EnrollmentRow>, AppError> {
    let rows = sqlx::query_as::<_, EnrollmentRow>(
        r#"
        SELECT
            e.track_id, t.slug, t.title, e.started_at, e.completed_at,
            (SELECT COUNT(*) FROM lesson_progress lp
               INNER JOIN lessons l ON l.id = lp.lesson_id
             WHERE lp.user_id = e.user_id AND l.track_id = e.track_id
               AND lp.completed_at IS NOT NULL) AS completed_lessons,
            (SELECT COUNT(*) FROM lessons l WHERE l.track_id = e.track_id) AS total_lessons
        FROM enrollments e
        INNER JOIN tracks t ON t.id = e.track_id
        WHERE e.user_id = $1
        ORDER BY e.started_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_progress(pool: &PgPool, user_id: Uuid) -> Result<Vec<ProgressRow>, AppError> {
    let rows = sqlx::query_as::<_, ProgressRow>(
        r#"
        SELECT lp.lesson_id, l.title AS lesson_title, t.id AS track_id,
               t.title AS track_title, lp.completed_at, lp.time_spent_ms
        FROM lesson_progress lp
        INNER JOIN lessons l ON l.id = lp.lesson_id
        INNER JOIN tracks t ON t.id = l.track_id
        WHERE lp.user_id = $1
        ORDER BY lp.completed_at DESC NULLS LAST
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_completions_since(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<Option<DateTime<Utc>>>, AppError> {
    let rows = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        r#"
        SELECT completed_at FROM lesson_progress
        WHERE user_id = $1 AND completed_at >= $2
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_quiz_outcomes(pool: &PgPool, user_id: Uuid) -> Result<Vec<bool>, AppError> {
    let attempts = sqlx::query_as::<_, QuizAttempt>(
        "SELECT * FROM quiz_attempts WHERE user_id = $1 ORDER BY attempted_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(attempts.into_iter().map(|a| a.passed).collect())
}

/// Newest published tracks the learner is not enrolled in.
async fn fetch_candidates(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<RecommendationCandidate>, AppError> {
    let rows = sqlx::query_as::<_, RecommendationCandidate>(
        r#"
        SELECT t.id, t.title, t.description, t.published_at, t.created_at
        FROM tracks t
        WHERE t.is_published = true
          AND NOT EXISTS (
              SELECT 1 FROM enrollments e WHERE e.track_id = t.id AND e.user_id = $1
          )
        ORDER BY COALESCE(t.published_at, t.created_at) DESC
        LIMIT 100
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
