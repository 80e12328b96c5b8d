//! Admin routes: affiliate rollups, payout batches and maintenance jobs.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::RequireAdmin;
use crate::models::audit::{AuditLog, PAYOUT_BATCH_ENTITY};
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::referral::{CreatePayoutBatch, PayoutBatch};
use crate::services::affiliate::{self, MaturationResult, ReferrerSummary};
use crate::services::audit;
use crate::services::enrollment::{self, ReconcileResult};
use crate::services::payout::{self, PayoutActor, PayoutFilters, PayoutTransitionResult};
use crate::AppState;

fn actor(admin: &RequireAdmin) -> PayoutActor {
    PayoutActor {
        id: admin.0.id,
        name: admin.0.email.clone(),
    }
}

/// GET /api/v1/admin/affiliates: per-referrer summaries
pub async fn list_affiliates(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<PagedResult<ReferrerSummary>>>, AppError> {
    let result = affiliate::list_summaries(&state.db, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/admin/payouts: batch a referrer's payable referrals
pub async fn create_payout(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Json(body): Json<CreatePayoutBatch>,
) -> Result<Json<ApiResponse<PayoutBatch>>, AppError> {
    body.validate()?;
    let batch = payout::create_batch(&state.db, &body, &actor(&admin)).await?;
    Ok(ApiResponse::success(batch))
}

/// GET /api/v1/admin/payouts
pub async fn list_payouts(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<PayoutFilters>,
) -> Result<Json<ApiResponse<PagedResult<PayoutBatch>>>, AppError> {
    let result = payout::list(&state.db, &filters, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/admin/payouts/{id}/mark-paid
pub async fn mark_paid(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PayoutTransitionResult>>, AppError> {
    let result = payout::mark_paid(&state.db, id, &actor(&admin)).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/v1/admin/payouts/{id}/export: CSV download
pub async fn export_payout(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let csv = payout::export_csv(&state.db, id).await?;
    let disposition = format!("attachment; filename=\"payout-{id}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// GET /api/v1/admin/payouts/{id}/audit: state change history
pub async fn payout_audit(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<AuditLog>>>, AppError> {
    let entries = audit::list_for_entity(&state.db, PAYOUT_BATCH_ENTITY, id).await?;
    Ok(ApiResponse::success(entries))
}

/// POST /api/v1/admin/referrals/mature: promote qualified referrals past the delay
pub async fn mature_referrals(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<ApiResponse<MaturationResult>>, AppError> {
    let result = affiliate::mature_referrals(
        &state.db,
        state.config.affiliate_qualification_days,
        Utc::now(),
    )
    .await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/admin/enrollments/reconcile: repair cached progress percentages
pub async fn reconcile_enrollments(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<ApiResponse<ReconcileResult>>, AppError> {
    let result = enrollment::reconcile(&state.db).await?;
    Ok(ApiResponse::success(result))
}
