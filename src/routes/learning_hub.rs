//! Learner dashboard routes. Every view is cut from the same cached dashboard.

use axum::{extract::State, Json};

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::services::learning_hub::{self, LearnerStats, LearningHubDashboard};
use crate::services::metrics::LearningAnalytics;
use crate::services::recommendations::Recommendation;
use crate::services::streak::StreakInfo;
use crate::AppState;

async fn load(state: &AppState, user: &CurrentUser) -> Result<LearningHubDashboard, AppError> {
    learning_hub::get_dashboard(&state.db, &state.cache, user.id).await
}

/// GET /api/v1/learning-hub
pub async fn dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<LearningHubDashboard>>, AppError> {
    Ok(ApiResponse::success(load(&state, &current_user).await?))
}

/// GET /api/v1/learning-hub/analytics
pub async fn analytics(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<LearningAnalytics>>, AppError> {
    let dashboard = load(&state, &current_user).await?;
    Ok(ApiResponse::success(dashboard.analytics))
}

/// GET /api/v1/learning-hub/streak
pub async fn streak(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<StreakInfo>>, AppError> {
    let dashboard = load(&state, &current_user).await?;
    Ok(ApiResponse::success(dashboard.streak))
}

/// GET /api/v1/learning-hub/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Recommendation>>>, AppError> {
    let dashboard = load(&state, &current_user).await?;
    Ok(ApiResponse::success(dashboard.recommendations))
}

/// GET /api/v1/learning-hub/stats
pub async fn stats(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<LearnerStats>>, AppError> {
    let dashboard = load(&state, &current_user).await?;
    Ok(ApiResponse::success(dashboard.stats))
}
