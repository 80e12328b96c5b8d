//! Audit log for administrative state changes.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::audit::{AuditLog, CreateAuditLog};

/// Insert an audit entry using any Postgres executor (pool or open transaction).
pub async fn record<'e, E>(executor: E, entry: &CreateAuditLog) -> Result<(), AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO audit_log (entity_type, entity_id, action, actor_id, actor_name, details)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&entry.entity_type)
    .bind(entry.entity_id)
    .bind(&entry.action)
    .bind(entry.actor_id)
    .bind(&entry.actor_name)
    .bind(&entry.details)
    .execute(executor)
    .await?;
    Ok(())
}

/// Audit trail of one entity, oldest first.
pub async fn list_for_entity(
    pool: &PgPool,
    entity_type: &str,
    entity_id: Uuid,
) -> Result<Vec<AuditLog>, AppError> {
    let rows = sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT * FROM audit_log
        WHERE entity_type = $1 AND entity_id = $2
        ORDER BY created_at, id
        "#,
    )
    .bind(entity_type)
    .bind(entity_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
