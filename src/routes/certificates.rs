//! Certificate routes.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::learning::CertificateWithTrack;
use crate::services::certificate;
use crate::AppState;

/// GET /api/v1/certificates: the caller's certificates
pub async fn list_mine(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<CertificateWithTrack>>>, AppError> {
    let certificates = certificate::list_for_user(&state.db, current_user.id).await?;
    Ok(ApiResponse::success(certificates))
}

/// GET /api/v1/certificates/verify/{code}: public verification
pub async fn verify(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<CertificateWithTrack>>, AppError> {
    let found = certificate::find_by_code(&state.db, &code).await?;
    Ok(ApiResponse::success(found))
}
