//! Enrollment and lesson completion.
//!
//! `enrollments.progress_pct` is a cache. It is always rewritten from the
//! lesson-progress count on completion, and `reconcile` repairs any drift.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::learning::{Certificate, CompleteLesson, Enrollment, LessonProgress};
use crate::services::{catalog, certificate, metrics};

/// Outcome of completing a lesson.
#[derive(Debug, Serialize)]
pub struct LessonCompletion {
    pub lesson_id: Uuid,
    pub track_id: Uuid,
    pub already_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub progress_pct: i32,
    pub track_completed: bool,
    pub certificate: Option<Certificate>,
}

/// Result of a cache reconciliation pass.
#[derive(Debug, Serialize)]
pub struct ReconcileResult {
    pub checked: usize,
    pub corrected: usize,
}

/// Cached vs. counted progress for one enrollment.
#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentCounts {
    pub enrollment_id: Uuid,
    pub progress_pct: i32,
    pub completed_lessons: i64,
    pub total_lessons: i64,
}

/// Enrollments whose cached percentage differs from the derived one, with the corrected value.
pub fn find_drift(rows: &[EnrollmentCounts]) -> Vec<(Uuid, i32)> {
    rows.iter()
        .filter_map(|row| {
            let derived = metrics::derive_progress_pct(row.completed_lessons, row.total_lessons);
            (derived != row.progress_pct).then_some((row.enrollment_id, derived))
        })
        .collect()
}

/// Enroll a user in a published track.
pub async fn enroll(pool: &PgPool, user_id: Uuid, track_id: Uuid) -> Result<Enrollment, AppError> {
    catalog::find_published(pool, track_id).await?;

    let enrollment = sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (user_id, track_id)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(track_id)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Already enrolled in this track".to_string())
        }
        _ => AppError::Database(e),
    })?;

    tracing::info!(%user_id, %track_id, "Enrolled user in track");
    Ok(enrollment)
}

/// Record a lesson completion and refresh the enrollment's progress.
pub async fn complete_lesson(
    pool: &PgPool,
    user_id: Uuid,
    lesson_id: Uuid,
    input: &CompleteLesson,
) -> Result<LessonCompletion, AppError> {
    let mut tx = pool.begin().await?;

    let track_id = sqlx::query_scalar::<_, Uuid>("SELECT track_id FROM lessons WHERE id = $1")
        .bind(lesson_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lesson not found".to_string()))?;

    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE user_id = $1 AND track_id = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(track_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::Forbidden("Enroll in the track before completing its lessons".to_string())
    })?;

    let existing = sqlx::query_as::<_, LessonProgress>(
        "SELECT * FROM lesson_progress WHERE user_id = $1 AND lesson_id = $2",
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_optional(&mut *tx)
    .await?;

    let already_completed = existing.as_ref().is_some_and(|p| p.completed_at.is_some());
    let progress = record_completion(&mut tx, user_id, lesson_id, input.time_spent_ms).await?;

    let (completed_lessons, total_lessons) = count_lessons(&mut tx, user_id, track_id).await?;
    let progress_pct = metrics::derive_progress_pct(completed_lessons, total_lessons);
    let track_completed = metrics::is_track_complete(completed_lessons, total_lessons);

    sqlx::query(
        r#"
        UPDATE enrollments
        SET progress_pct = $1,
            completed_at = CASE WHEN $2 THEN COALESCE(completed_at, NOW()) ELSE completed_at END
        WHERE id = $3
        "#,
    )
    .bind(progress_pct)
    .bind(track_completed)
    .bind(enrollment.id)
    .execute(&mut *tx)
    .await?;

    let certificate = if track_completed {
        Some(certificate::issue(&mut tx, user_id, track_id, Utc::now()).await?)
    } else {
        None
    };

    tx.commit().await?;

    tracing::info!(
        %user_id,
        %lesson_id,
        %track_id,
        progress_pct,
        already_completed,
        "Lesson completion recorded"
    );

    Ok(LessonCompletion {
        lesson_id,
        track_id,
        already_completed,
        completed_at: progress.completed_at,
        completed_lessons,
        total_lessons,
        progress_pct,
        track_completed,
        certificate,
    })
}

/// Recompute every cached `progress_pct` from lesson-progress counts.
pub async fn reconcile(pool: &PgPool) -> Result<ReconcileResult, AppError> {
    let rows = sqlx::query_as::<_, EnrollmentCounts>(
        r#"
        SELECT
            e.id AS enrollment_id,
            e.progress_pct,
            (SELECT COUNT(*) FROM lesson_progress lp
               INNER JOIN lessons l ON l.id = lp.lesson_id
             WHERE lp.user_id = e.user_id AND l.track_id = e.track_id
               AND lp.completed_at IS NOT NULL) AS completed_lessons,
            (SELECT COUNT(*) FROM lessons l WHERE l.track_id = e.track_id) AS total_lessons
        FROM enrollments e
        "#,
    )
    .fetch_all(pool)
    .await?;

    let drift = find_drift(&rows);
    if !drift.is_empty() {
        let mut tx = pool.begin().await?;
        for (enrollment_id, pct) in &drift {
            sqlx::query("UPDATE enrollments SET progress_pct = $1 WHERE id = $2")
                .bind(pct)
                .bind(enrollment_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        tracing::warn!(corrected = drift.len(), "Corrected drifted enrollment progress");
    }

    Ok(ReconcileResult {
        checked: rows.len(),
        corrected: drift.len(),
    })
}

/// Upsert the progress row. The first completion time and the first known
/// duration are kept; a repeat only fills a duration that was never sent.
async fn record_completion(
    conn: &mut PgConnection,
    user_id: Uuid,
    lesson_id: Uuid,
    time_spent_ms: Option<i64>,
) -> Result<LessonProgress, AppError> {
    let row = sqlx::query_as::<_, LessonProgress>(
        r#"
        INSERT INTO lesson_progress (user_id, lesson_id, completed_at, time_spent_ms)
        VALUES ($1, $2, NOW(), $3)
        ON CONFLICT (user_id, lesson_id) DO UPDATE
        SET completed_at = COALESCE(lesson_progress.completed_at, EXCLUDED.completed_at),
            time_spent_ms = COALESCE(lesson_progress.time_spent_ms, EXCLUDED.time_spent_ms)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(time_spent_ms)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

async fn count_lessons(
    conn: &mut PgConnection,
    user_id: Uuid,
    track_id: Uuid,
) -> Result<(i64, i64), AppError> {
    let completed = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM lesson_progress lp
        INNER JOIN lessons l ON l.id = lp.lesson_id
        WHERE lp.user_id = $1 AND l.track_id = $2 AND lp.completed_at IS NOT NULL
        "#,
    )
    .bind(user_id)
    .bind(track_id)
    .fetch_one(&mut *conn)
    .await?;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons WHERE track_id = $1")
        .bind(track_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok((completed, total))
}
