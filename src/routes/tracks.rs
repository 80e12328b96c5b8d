//! Track catalog and enrollment routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::learning::Enrollment;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::track::{TrackDetail, TrackSummary};
use crate::services::{catalog, enrollment};
use crate::AppState;

/// GET /api/v1/tracks: published tracks, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<PagedResult<TrackSummary>>>, AppError> {
    let result = catalog::list_published(&state.db, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/v1/tracks/{track}: track with ordered sections and lessons
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<TrackDetail>>, AppError> {
    let detail = catalog::find_by_slug(&state.db, &slug).await?;
    Ok(ApiResponse::success(detail))
}

/// POST /api/v1/tracks/{track}/enroll
pub async fn enroll(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(track_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Enrollment>>, AppError> {
    let enrollment = enrollment::enroll(&state.db, current_user.id, track_id).await?;
    state.cache.invalidate(current_user.id).await;
    Ok(ApiResponse::success(enrollment))
}
