//! Lesson completion route.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::learning::CompleteLesson;
use crate::services::enrollment::{self, LessonCompletion};
use crate::AppState;

/// POST /api/v1/lessons/{id}/complete
pub async fn complete(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lesson_id): Path<Uuid>,
    Json(body): Json<CompleteLesson>,
) -> Result<Json<ApiResponse<LessonCompletion>>, AppError> {
    body.validate()?;
    let completion =
        enrollment::complete_lesson(&state.db, current_user.id, lesson_id, &body).await?;
    state.cache.invalidate(current_user.id).await;
    Ok(ApiResponse::success(completion))
}
