// src/db/pricing_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::pricing::{FlowTemplateLine, PriceFactor, Unit, UnitStatus},
};

#[derive(Clone, Default)]
pub struct PricingRepository;

impl PricingRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  UNIDADES
    // =========================================================================

    pub async fn find_unit<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        unit_id: Uuid,
    ) -> Result<Option<Unit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let unit = sqlx::query_as::<_, Unit>(
            r#"
            SELECT id, tenant_id, name, area, status, created_at
            FROM units
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
            .bind(tenant_id)
            .bind(unit_id)
            .fetch_optional(executor)
            .await?;

        Ok(unit)
    }

    /// Troca o status só se a unidade ainda estiver no status esperado.
    /// Retorna `false` se outra transação chegou antes.
    pub async fn transition_unit_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        unit_id: Uuid,
        from: UnitStatus,
        to: UnitStatus,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE units SET status = $4, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status = $3
            "#,
        )
            .bind(tenant_id)
            .bind(unit_id)
            .bind(from)
            .bind(to)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    //  TABELA DE PREÇO
    // =========================================================================

    /// Fatores da unidade na tabela, desde que a tabela esteja ativa.
    pub async fn find_active_price_factor<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        table_price_id: Uuid,
        unit_id: Uuid,
    ) -> Result<Option<PriceFactor>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let factor = sqlx::query_as::<_, PriceFactor>(
            r#"
            SELECT f.unit_id, f.table_price_id, f.price_per_area,
                   f.floor_factor, f.management_factor, f.correction_factor
            FROM price_factors f
            JOIN price_tables t ON t.id = f.table_price_id
            WHERE t.tenant_id = $1
              AND t.id = $2
              AND f.unit_id = $3
              AND t.is_active = TRUE
            "#,
        )
            .bind(tenant_id)
            .bind(table_price_id)
            .bind(unit_id)
            .fetch_optional(executor)
            .await?;

        Ok(factor)
    }

    pub async fn list_template_lines<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        table_price_id: Uuid,
    ) -> Result<Vec<FlowTemplateLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, FlowTemplateLine>(
            r#"
            SELECT l.kind, l.percentage_of_total, l.installment_count,
                   l.periodicity_months, l.first_due_date
            FROM flow_template_lines l
            JOIN price_tables t ON t.id = l.table_price_id
            WHERE t.tenant_id = $1 AND t.id = $2
            ORDER BY l.position ASC
            "#,
        )
            .bind(tenant_id)
            .bind(table_price_id)
            .fetch_all(executor)
            .await?;

        Ok(lines)
    }
}
