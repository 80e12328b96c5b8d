//! Referrer-facing affiliate route.

use axum::{extract::State, Json};

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::services::affiliate::{self, ReferrerSummary};
use crate::AppState;

/// GET /api/v1/affiliate/summary: the caller's referral totals
pub async fn summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<ReferrerSummary>>, AppError> {
    let summary = affiliate::summary_for(&state.db, current_user.id).await?;
    Ok(ApiResponse::success(summary))
}
