//! Affiliate referral aggregation and qualification maturation.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::referral::{Referral, ReferralStatus};

/// Per-referrer rollup of referral records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferrerSummary {
    pub referrer_id: Uuid,
    pub total_signups: i64,
    pub qualified: i64,
    pub payable: i64,
    pub paid_total_cents: i64,
}

impl ReferrerSummary {
    fn add(&mut self, referral: &Referral) {
        self.total_signups += 1;
        if referral.status.is_qualified() {
            self.qualified += 1;
        }
        match referral.status {
            ReferralStatus::Payable => self.payable += 1,
            ReferralStatus::Paid => {
                self.paid_total_cents = self.paid_total_cents.saturating_add(referral.commission_cents)
            }
            _ => {}
        }
    }
}

/// Result of promoting matured referrals to payable.
#[derive(Debug, Serialize)]
pub struct MaturationResult {
    pub promoted: u64,
    pub cutoff: DateTime<Utc>,
}

/// Summarize the referrals that belong to `referrer_id`; others are ignored.
pub fn summarize(referrer_id: Uuid, referrals: &[Referral]) -> ReferrerSummary {
    referrals
        .iter()
        .filter(|r| r.referrer_id == referrer_id)
        .fold(
            ReferrerSummary {
                referrer_id,
                ..ReferrerSummary::default()
            },
            |mut acc, r| {
                acc.add(r);
                acc
            },
        )
}

/// Summaries for every referrer present, in order of first appearance.
pub fn summarize_by_referrer(referrals: &[Referral]) -> Vec<ReferrerSummary> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_referrer: HashMap<Uuid, ReferrerSummary> = HashMap::new();

    for referral in referrals {
        by_referrer
            .entry(referral.referrer_id)
            .or_insert_with(|| {
                order.push(referral.referrer_id);
                ReferrerSummary {
                    referrer_id: referral.referrer_id,
                    ..ReferrerSummary::default()
                }
            })
            .add(referral);
    }

    order
        .into_iter()
        .filter_map(|id| by_referrer.remove(&id))
        .collect()
}

/// Whether a qualified referral has waited out the qualification delay.
pub fn is_mature(referral: &Referral, delay_days: i64, now: DateTime<Utc>) -> bool {
    referral.status == ReferralStatus::Qualified
        && referral
            .qualified_at
            .is_some_and(|at| at + Duration::days(delay_days) <= now)
}

/// Summary for a single referrer.
pub async fn summary_for(pool: &PgPool, referrer_id: Uuid) -> Result<ReferrerSummary, AppError> {
    let referrals = sqlx::query_as::<_, Referral>("SELECT * FROM referrals WHERE referrer_id = $1")
        .bind(referrer_id)
        .fetch_all(pool)
        .await?;
    Ok(summarize(referrer_id, &referrals))
}

/// Paged summaries across all referrers.
pub async fn list_summaries(
    pool: &PgPool,
    pagination: &Pagination,
) -> Result<PagedResult<ReferrerSummary>, AppError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT referrer_id) FROM referrals")
        .fetch_one(pool)
        .await?;

    let referrer_ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT referrer_id FROM referrals ORDER BY referrer_id LIMIT $1 OFFSET $2",
    )
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let referrals = sqlx::query_as::<_, Referral>(
        "SELECT * FROM referrals WHERE referrer_id = ANY($1) ORDER BY referrer_id, signed_up_at",
    )
    .bind(&referrer_ids)
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(
        summarize_by_referrer(&referrals),
        total,
        pagination,
    ))
}

/// Move qualified referrals past the qualification delay to payable.
pub async fn mature_referrals(
    pool: &PgPool,
    delay_days: i64,
    now: DateTime<Utc>,
) -> Result<MaturationResult, AppError> {
    let cutoff = now - Duration::days(delay_days);
    let qualified = sqlx::query_as::<_, Referral>(
        "SELECT * FROM referrals WHERE status = 'QUALIFIED' AND qualified_at IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    let matured: Vec<Uuid> = qualified
        .iter()
        .filter(|r| is_mature(r, delay_days, now))
        .map(|r| r.id)
        .collect();

    if matured.is_empty() {
        return Ok(MaturationResult {
            promoted: 0,
            cutoff,
        });
    }

    let promoted = sqlx::query(
        "UPDATE referrals SET status = 'PAYABLE' WHERE id = ANY($1) AND status = 'QUALIFIED'",
    )
    .bind(&matured)
    .execute(pool)
    .await?
    .rows_affected();

    tracing::info!(promoted, %cutoff, "Matured qualified referrals");
    Ok(MaturationResult { promoted, cutoff })
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
            qualified_at: None,
            payout_batch_id: None,
        }
    }

    #[test]
    fn empty_referrals_summarize_to_zero() {
        let id = Uuid::new_v4();
        let summary = summarize(id, &[]);
        assert_eq!(
            summary,
            ReferrerSummary {
                referrer_id: id,
                ..ReferrerSummary::default()
            }
        );
    }

    #[test]
    fn summary_counts_each_status_bucket() {
        let id = Uuid::new_v4();
        let referrals = vec![
            referral(id, ReferralStatus::Pending, 1000),
            referral(id, ReferralStatus::Qualified, 1000),
            referral(id, ReferralStatus::Payable, 2000),
            referral(id, ReferralStatus::Payable, 1500),
            referral(id, ReferralStatus::Paid, 1000),
            referral(id, ReferralStatus::Paid, 2500),
            referral(id, ReferralStatus::Rejected, 9999),
        ];
        let summary = summarize(id, &referrals);
        assert_eq!(summary.total_signups, 7);
        assert_eq!(summary.qualified, 5);
        assert_eq!(summary.payable, 2);
        assert_eq!(summary.paid_total_cents, 3500);
    }

    #[test]
    fn summary_ignores_other_referrers() {
        let me = Uuid::new_v4();
        let referrals = vec![
            referral(me, ReferralStatus::Paid, 1000),
            referral(Uuid::new_v4(), ReferralStatus::Paid, 5000),
        ];
        let summary = summarize(me, &referrals);
        assert_eq!(summary.total_signups, 1);
        assert_eq!(summary.paid_total_cents, 1000);
    }

    #[test]
    fn summaries_grouped_in_first_seen_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let referrals = vec![
            referral(b, ReferralStatus::Payable, 100),
            referral(a, ReferralStatus::Pending, 100),
            referral(b, ReferralStatus::Paid, 300),
        ];
        let summaries = summarize_by_referrer(&referrals);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].referrer_id, b);
        assert_eq!(summaries[0].total_signups, 2);
        assert_eq!(summaries[0].paid_total_cents, 300);
        assert_eq!(summaries[1].referrer_id, a);
        assert_eq!(summaries[1].qualified, 0);
    }

    #[test]
    fn maturity_requires_elapsed_delay() {
        let now = Utc::now();
        let mut r = referral(Uuid::new_v4(), ReferralStatus::Qualified, 1000);

        r.qualified_at = Some(now - Duration::days(29));
        assert!(!is_mature(&r, 30, now));

        r.qualified_at = Some(now - Duration::days(30));
        assert!(is_mature(&r, 30, now));

        r.qualified_at = None;
        assert!(!is_mature(&r, 30, now));
    }

    #[test]
    fn only_qualified_referrals_mature() {
        let now = Utc::now();
        let mut r = referral(Uuid::new_v4(), ReferralStatus::Pending, 1000);
        r.qualified_at = Some(now - Duration::days(90));
        assert!(!is_mature(&r, 30, now));
    }
}
