//! Audit trail for administrative state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub action: String,
    pub actor_id: Option<Uuid>,
    pub actor_name: String,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Entity type recorded for payout batch actions.
pub const PAYOUT_BATCH_ENTITY: &str = "payout_batch";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLog {
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub action: String,
    pub actor_id: Option<Uuid>,
    pub actor_name: String,
    pub details: Option<serde_json::Value>,
}

impl CreateAuditLog {
    /// Audit entry for an action on a payout batch.
    pub fn payout_batch(
        batch_id: Uuid,
        action: &str,
        actor_id: Uuid,
        actor_name: &str,
        details: serde_json::Value,
    ) -> Self {
        Self {
            entity_type: PAYOUT_BATCH_ENTITY.to_string(),
            entity_id: Some(batch_id),
            action: action.to_string(),
            actor_id: Some(actor_id),
            actor_name: actor_name.to_string(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_batch_entry_carries_entity() {
        let id = Uuid::new_v4();
        let entry = CreateAuditLog::payout_batch(
            id,
            "mark_paid",
            Uuid::nil(),
            "admin@learnhub.local",
            serde_json::json!({ "previous_status": "READY" }),
        );
        assert_eq!(entry.entity_type, "payout_batch");
        assert_eq!(entry.entity_id, Some(id));
        assert_eq!(entry.details.unwrap()["previous_status"], "READY");
    }
}
