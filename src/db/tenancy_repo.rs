// src/db/tenancy_repo.rs

use sqlx::PgPool;
use uuid::Uuid;
use crate::common::error::AppError;

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se um usuário tem vínculo com a construtora (tenant).
    pub async fn check_user_tenancy(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool, AppError> {

        // SELECT EXISTS: só queremos saber se a linha existe.
        let exists: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_tenants
                WHERE user_id = $1 AND tenant_id = $2
            )
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists.unwrap_or(false))
    }
}
