//! Payout batching for affiliate referrers.
//!
//! A batch groups a referrer's payable, unbatched referrals and carries their
//! summed commission. Batches move `READY -> PAID` exactly once; marking a
//! batch paid also settles its referrals. Every state change is audited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::audit::CreateAuditLog;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::referral::{
    CreatePayoutBatch, PayoutBatch, PayoutStatus, Referral, ReferralStatus,
};
use crate::services::audit;

/// Admin performing a payout action.
#[derive(Debug, Clone)]
pub struct PayoutActor {
    pub id: Uuid,
    pub name: String,
}

/// Filters for listing payout batches.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PayoutFilters {
    pub status: Option<PayoutStatus>,
    pub referrer_id: Option<Uuid>,
}

/// Result of a successful batch status change.
#[derive(Debug, Serialize)]
pub struct PayoutTransitionResult {
    pub batch_id: Uuid,
    pub previous_status: PayoutStatus,
    pub new_status: PayoutStatus,
    pub referrals_settled: u64,
    pub paid_at: DateTime<Utc>,
}

/// One CSV line of a batch export.
#[derive(Debug, Serialize)]
struct PayoutLine {
    batch_id: Uuid,
    referrer_id: Uuid,
    referral_id: Uuid,
    referred_user_id: Uuid,
    signed_up_at: String,
    commission_cents: i64,
    amount: String,
}

/// Check whether a batch status change follows the allowed graph.
pub fn is_valid_transition(from: PayoutStatus, to: PayoutStatus) -> bool {
    matches!((from, to), (PayoutStatus::Ready, PayoutStatus::Paid))
}

pub fn validate_transition(from: PayoutStatus, to: PayoutStatus) -> Result<(), AppError> {
    if !is_valid_transition(from, to) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot transition payout batch from {from:?} to {to:?}"
        )));
    }
    Ok(())
}

/// Whether a referral can be placed in a new batch for `referrer_id`.
pub fn is_batchable(referral: &Referral, referrer_id: Uuid) -> bool {
    referral.referrer_id == referrer_id
        && referral.status == ReferralStatus::Payable
        && referral.payout_batch_id.is_none()
}

/// Pick the referrals for a new batch.
///
/// With no selection every batchable candidate is taken. With a selection,
/// each id must name a batchable candidate. An empty result is rejected.
pub fn select_batch_referrals<'a>(
    candidates: &'a [Referral],
    referrer_id: Uuid,
    selection: Option<&[Uuid]>,
) -> Result<Vec<&'a Referral>, AppError> {
    let eligible: Vec<&Referral> = candidates
        .iter()
        .filter(|r| is_batchable(r, referrer_id))
        .collect();

    let chosen = match selection {
        None => eligible,
        Some(ids) => {
            let mut chosen: Vec<&Referral> = Vec::with_capacity(ids.len());
            for id in ids {
                if chosen.iter().any(|r| r.id == *id) {
                    continue;
                }
                let referral = eligible.iter().find(|r| r.id == *id).copied().ok_or_else(|| {
                    AppError::Validation(format!(
                        "Referral {id} is not payable for referrer {referrer_id}"
                    ))
                })?;
                chosen.push(referral);
            }
            chosen
        }
    };

    if chosen.is_empty() {
        return Err(AppError::Validation(
            "No payable referrals to batch".to_string(),
        ));
    }
    Ok(chosen)
}

pub fn batch_total_cents(referrals: &[&Referral]) -> i64 {
    referrals
        .iter()
        .fold(0i64, |acc, r| acc.saturating_add(r.commission_cents))
}

/// Render a batch and its referrals as CSV.
pub fn render_csv(batch: &PayoutBatch, referrals: &[Referral]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for referral in referrals {
        writer
            .serialize(PayoutLine {
                batch_id: batch.id,
                referrer_id: batch.referrer_id,
                referral_id: referral.id,
                referred_user_id: referral.referred_user_id,
                signed_up_at: referral.signed_up_at.to_rfc3339(),
                commission_cents: referral.commission_cents,
                amount: format_cents(referral.commission_cents),
            })
            .map_err(|e| AppError::Internal(format!("CSV write failed: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV encoding failed: {e}")))
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Create a READY batch from the referrer's payable referrals.
pub async fn create_batch(
    pool: &PgPool,
    request: &CreatePayoutBatch,
    actor: &PayoutActor,
) -> Result<PayoutBatch, AppError> {
    let mut tx = pool.begin().await?;

    let candidates = sqlx::query_as::<_, Referral>(
        r#"
        SELECT * FROM referrals
        WHERE referrer_id = $1 AND status = 'PAYABLE' AND payout_batch_id IS NULL
        ORDER BY signed_up_at
        FOR UPDATE
        "#,
    )
    .bind(request.referrer_id)
    .fetch_all(&mut *tx)
    .await?;

    let selected = select_batch_referrals(
        &candidates,
        request.referrer_id,
        request.referral_ids.as_deref(),
    )?;
    let total = batch_total_cents(&selected);
    let ids: Vec<Uuid> = selected.iter().map(|r| r.id).collect();
    let count = i32::try_from(ids.len())
        .map_err(|_| AppError::Validation("Too many referrals in one batch".to_string()))?;

    let batch = sqlx::query_as::<_, PayoutBatch>(
        r#"
        INSERT INTO payout_batches (referrer_id, status, total_amount_cents, referral_count, created_by)
        VALUES ($1, 'READY', $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(request.referrer_id)
    .bind(total)
    .bind(count)
    .bind(actor.id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE referrals SET payout_batch_id = $1 WHERE id = ANY($2)")
        .bind(batch.id)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

    audit::record(
        &mut *tx,
        &CreateAuditLog::payout_batch(
            batch.id,
            "create",
            actor.id,
            &actor.name,
            serde_json::json!({
                "referrer_id": request.referrer_id,
                "referral_ids": ids,
                "total_amount_cents": total,
            }),
        ),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        batch_id = %batch.id,
        referrer_id = %batch.referrer_id,
        total_amount_cents = total,
        referral_count = count,
        "Created payout batch"
    );
    Ok(batch)
}

/// Mark a READY batch as PAID and settle its referrals.
pub async fn mark_paid(
    pool: &PgPool,
    batch_id: Uuid,
    actor: &PayoutActor,
) -> Result<PayoutTransitionResult, AppError> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_scalar::<_, PayoutStatus>(
        "SELECT status FROM payout_batches WHERE id = $1 FOR UPDATE",
    )
    .bind(batch_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Payout batch not found".to_string()))?;

    validate_transition(current, PayoutStatus::Paid)?;

    let paid_at = sqlx::query_scalar::<_, DateTime<Utc>>(
        "UPDATE payout_batches SET status = 'PAID', paid_at = NOW() WHERE id = $1 RETURNING paid_at",
    )
    .bind(batch_id)
    .fetch_one(&mut *tx)
    .await?;

    let settled = sqlx::query("UPDATE referrals SET status = 'PAID' WHERE payout_batch_id = $1")
        .bind(batch_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    audit::record(
        &mut *tx,
        &CreateAuditLog::payout_batch(
            batch_id,
            "mark_paid",
            actor.id,
            &actor.name,
            serde_json::json!({
                "previous_status": current,
                "new_status": PayoutStatus::Paid,
                "referrals_settled": settled,
            }),
        ),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(batch_id = %batch_id, settled, "Payout batch marked paid");
    Ok(PayoutTransitionResult {
        batch_id,
        previous_status: current,
        new_status: PayoutStatus::Paid,
        referrals_settled: settled,
        paid_at,
    })
}

/// List payout batches, newest first.
pub async fn list(
    pool: &PgPool,
    filters: &PayoutFilters,
    pagination: &Pagination,
) -> Result<PagedResult<PayoutBatch>, AppError> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM payout_batches
        WHERE ($1::payout_status IS NULL OR status = $1)
          AND ($2::uuid IS NULL OR referrer_id = $2)
        "#,
    )
    .bind(filters.status)
    .bind(filters.referrer_id)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, PayoutBatch>(
        r#"
        SELECT * FROM payout_batches
        WHERE ($1::payout_status IS NULL OR status = $1)
          AND ($2::uuid IS NULL OR referrer_id = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(filters.status)
    .bind(filters.referrer_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(items, total, pagination))
}

/// Export a batch's referral lines as CSV.
pub async fn export_csv(pool: &PgPool, batch_id: Uuid) -> Result<String, AppError> {
    let batch = sqlx::query_as::<_, PayoutBatch>("SELECT * FROM payout_batches WHERE id = $1")
        .bind(batch_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Payout batch not found".to_string()))?;

    let referrals = sqlx::query_as::<_, Referral>(
        "SELECT * FROM referrals WHERE payout_batch_id = $1 ORDER BY signed_up_at",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    render_csv(&batch, &referrals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn referral(referrer_id: Uuid, status: ReferralStatus, cents: i64) -> Referral {
        Referral {
            id: Uuid::new_v4(),
            referrer_id,
            referred_user_id: Uuid::new_v4(),
            status,
            commission_cents: cents,
            signed_up_at: Utc::now(),
            qualified_at: Some(Utc::now()),
            payout_batch_id: None,
        }
    }

    // -- Transitions --

    #[test]
    fn ready_to_paid_is_valid() {
        assert!(is_valid_transition(PayoutStatus::Ready, PayoutStatus::Paid));
    }

    #[test]
    fn paid_is_terminal() {
        assert!(!is_valid_transition(PayoutStatus::Paid, PayoutStatus::Ready));
        assert!(!is_valid_transition(PayoutStatus::Paid, PayoutStatus::Paid));
        let err = validate_transition(PayoutStatus::Paid, PayoutStatus::Paid).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn ready_to_ready_is_invalid() {
        assert!(!is_valid_transition(PayoutStatus::Ready, PayoutStatus::Ready));
    }

    // -- Selection --

    #[test]
    fn three_payable_referrals_total_4500() {
        let referrer = Uuid::new_v4();
        let candidates = vec![
            referral(referrer, ReferralStatus::Payable, 1000),
            referral(referrer, ReferralStatus::Payable, 2000),
            referral(referrer, ReferralStatus::Payable, 1500),
        ];
        let selected = select_batch_referrals(&candidates, referrer, None).unwrap();
        assert_eq!(selected.len(), 3);
        assert_eq!(batch_total_cents(&selected), 4500);
    }

    #[test]
    fn non_payable_and_batched_referrals_are_skipped() {
        let referrer = Uuid::new_v4();
        let mut batched = referral(referrer, ReferralStatus::Payable, 700);
        batched.payout_batch_id = Some(Uuid::new_v4());
        let candidates = vec![
            referral(referrer, ReferralStatus::Payable, 1000),
            referral(referrer, ReferralStatus::Qualified, 2000),
            referral(referrer, ReferralStatus::Paid, 3000),
            referral(Uuid::new_v4(), ReferralStatus::Payable, 4000),
            batched,
        ];
        let selected = select_batch_referrals(&candidates, referrer, None).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(batch_total_cents(&selected), 1000);
    }

    #[test]
    fn subset_selection_sums_only_chosen() {
        let referrer = Uuid::new_v4();
        let candidates = vec![
            referral(referrer, ReferralStatus::Payable, 1000),
            referral(referrer, ReferralStatus::Payable, 2000),
            referral(referrer, ReferralStatus::Payable, 1500),
        ];
        let ids = [candidates[0].id, candidates[2].id, candidates[0].id];
        let selected = select_batch_referrals(&candidates, referrer, Some(&ids)).unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(batch_total_cents(&selected), 2500);
    }

    #[test]
    fn selecting_ineligible_referral_fails() {
        let referrer = Uuid::new_v4();
        let candidates = vec![
            referral(referrer, ReferralStatus::Payable, 1000),
            referral(referrer, ReferralStatus::Pending, 2000),
        ];
        let ids = [candidates[1].id];
        let err = select_batch_referrals(&candidates, referrer, Some(&ids)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn nothing_payable_fails() {
        let err = select_batch_referrals(&[], Uuid::new_v4(), None).unwrap_err();
        assert!(err.to_string().contains("No payable referrals"));
    }

    // -- Export --

    #[test]
    fn csv_has_header_and_one_line_per_referral() {
        let referrer = Uuid::new_v4();
        let referrals = vec![
            referral(referrer, ReferralStatus::Paid, 1000),
            referral(referrer, ReferralStatus::Paid, 1505),
        ];
        let batch = PayoutBatch {
            id: Uuid::new_v4(),
            referrer_id: referrer,
            status: PayoutStatus::Paid,
            total_amount_cents: 2505,
            referral_count: 2,
            created_by: None,
            created_at: Utc::now(),
            paid_at: Some(Utc::now()),
        };

        let csv = render_csv(&batch, &referrals).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("batch_id,referrer_id,referral_id"));
        assert!(lines[2].ends_with(",1505,15.05"));
    }

    #[test]
    fn cents_format_as_currency() {
        assert_eq!(format_cents(4500), "45.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-250), "-2.50");
    }
}
