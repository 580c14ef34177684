use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

pub const RECONCILIATION_GAP: &str = "payment_reconciliation_gap";
pub const ORDER_PERSIST_FAILED: &str = "payment_order_persist_failed";
pub const AMOUNT_MISMATCH: &str = "payment_amount_mismatch";

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Audit write whose failure is only logged; used on paths that must not fail.
pub async fn log_audit_best_effort(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) {
    if let Err(err) = log_audit(pool, user_id, action, resource, metadata).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
