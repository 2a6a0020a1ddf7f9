//! PostgreSQL-backed append-only audit store.

use async_trait::async_trait;
use clinicore_application::AuditStore;
use clinicore_core::{AppError, AppResult};
use clinicore_domain::AuditRecord;
use sqlx::PgPool;

/// PostgreSQL audit store implementation. Rows are only ever inserted.
#[derive(Clone)]
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn append(&self, record: AuditRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_records (
                id,
                actor_id,
                tenant_id,
                action,
                resource,
                resource_id,
                details,
                ip_address,
                client_agent,
                risk_level,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(record.actor_id.as_uuid())
        .bind(record.tenant_id.as_uuid())
        .bind(record.action.as_str())
        .bind(record.resource)
        .bind(record.resource_id)
        .bind(record.details)
        .bind(record.ip_address)
        .bind(record.client_agent)
        .bind(record.risk_level.as_str())
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit record: {error}")))?;

        Ok(())
    }
}
