//! Published track catalog.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::track::{Lesson, Track, TrackDetail, TrackSection, TrackSummary};

/// List published tracks, newest first.
pub async fn list_published(
    pool: &PgPool,
    pagination: &Pagination,
) -> Result<PagedResult<TrackSummary>, AppError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tracks WHERE is_published = true")
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, TrackSummary>(
        r#"
        SELECT t.id, t.slug, t.title, t.description, t.published_at,
               (SELECT COUNT(*) FROM lessons l WHERE l.track_id = t.id) AS lesson_count
        FROM tracks t
        WHERE t.is_published = true
        ORDER BY COALESCE(t.published_at, t.created_at) DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(items, total, pagination))
}

/// Load a published track by slug with its sections and lessons in order.
pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<TrackDetail, AppError> {
    let track = sqlx::query_as::<_, Track>(
        "SELECT * FROM tracks WHERE slug = $1 AND is_published = true",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Track '{slug}' not found")))?;

    let (sections, lessons) = tokio::try_join!(
        fetch_sections(pool, track.id),
        fetch_lessons(pool, track.id),
    )?;

    Ok(TrackDetail::assemble(track, sections, lessons))
}

/// Load a published track by id.
pub async fn find_published(pool: &PgPool, track_id: Uuid) -> Result<Track, AppError> {
    sqlx::query_as::<_, Track>("SELECT * FROM tracks WHERE id = $1 AND is_published = true")
        .bind(track_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Track not found".to_string()))
}

async fn fetch_sections(pool: &PgPool, track_id: Uuid) -> Result<Vec<TrackSection>, AppError> {
    let rows = sqlx::query_as::<_, TrackSection>(
        "SELECT * FROM track_sections WHERE track_id = $1 ORDER BY position, title",
    )
    .bind(track_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_lessons(pool: &PgPool, track_id: Uuid) -> Result<Vec<Lesson>, AppError> {
    let rows = sqlx::query_as::<_, Lesson>(
        r#"
        SELECT id, track_id, section_id, title, position, duration_minutes
        FROM lessons
        WHERE track_id = $1
        ORDER BY position, created_at
        "#,
    )
    .bind(track_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
