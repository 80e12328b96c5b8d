//! Affiliate referrals and the payout batches that settle them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// -- Enums matching PostgreSQL --

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "referral_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    Pending,
    Qualified,
    Payable,
    Paid,
    Rejected,
}

impl ReferralStatus {
    /// Whether the referral has passed qualification (regardless of payout state).
    pub fn is_qualified(&self) -> bool {
        matches!(self, Self::Qualified | Self::Payable | Self::Paid)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payout_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Ready,
    Paid,
}

// -- Referral --

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_user_id: Uuid,
    pub status: ReferralStatus,
    pub commission_cents: i64,
    pub signed_up_at: DateTime<Utc>,
    pub qualified_at: Option<DateTime<Utc>>,
    pub payout_batch_id: Option<Uuid>,
}

// -- Payout Batch --

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayoutBatch {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub status: PayoutStatus,
    pub total_amount_cents: i64,
    pub referral_count: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Request to batch a referrer's payable referrals.
///
/// When `referral_ids` is absent every unbatched payable referral is included.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePayoutBatch {
    pub referrer_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub referral_ids: Option<Vec<Uuid>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_status_uses_screaming_case() {
        let json = serde_json::to_string(&ReferralStatus::Payable).unwrap();
        assert_eq!(json, "\"PAYABLE\"");
        let status: PayoutStatus = serde_json::from_str("\"READY\"").unwrap();
        assert_eq!(status, PayoutStatus::Ready);
    }

    #[test]
    fn qualified_includes_later_states() {
        assert!(!ReferralStatus::Pending.is_qualified());
        assert!(!ReferralStatus::Rejected.is_qualified());
        assert!(ReferralStatus::Qualified.is_qualified());
        assert!(ReferralStatus::Payable.is_qualified());
        assert!(ReferralStatus::Paid.is_qualified());
    }

    #[test]
    fn empty_selection_is_rejected() {
        let request = CreatePayoutBatch {
            referrer_id: Uuid::nil(),
            referral_ids: Some(Vec::new()),
        };
        assert!(request.validate().is_err());
    }
}
