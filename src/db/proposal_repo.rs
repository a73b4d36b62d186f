// src/db/proposal_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        pricing::ConditionType,
        proposal::{CorrectedCondition, Proposal, ProposalInstallment, ProposalParcel},
    },
};

// Linha crua de 'proposal_conditions'; vira CorrectedCondition para a API.
#[derive(Debug, FromRow)]
struct ConditionRow {
    kind: String,
    periodicity: String,
    periodicity_months: i32,
    installment_count: i32,
    installment_amount: Decimal,
    total_amount: Decimal,
    first_due_date: NaiveDate,
}

impl From<ConditionRow> for CorrectedCondition {
    fn from(row: ConditionRow) -> Self {
        CorrectedCondition {
            kind: ConditionType::from_label(&row.kind),
            periodicity: row.periodicity,
            periodicity_months: row.periodicity_months,
            installment_count: row.installment_count,
            installment_amount: row.installment_amount,
            total_amount: row.total_amount,
            first_due_date: row.first_due_date,
        }
    }
}

#[derive(Clone, Default)]
pub struct ProposalRepository;

impl ProposalRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create_proposal<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        unit_id: Uuid,
        table_price_id: Option<Uuid>,
        customer_name: &str,
        total_value: Decimal,
        created_by: Uuid,
    ) -> Result<Proposal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let proposal = sqlx::query_as::<_, Proposal>(
            r#"
            INSERT INTO proposals (tenant_id, unit_id, table_price_id, customer_name, total_value, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, tenant_id, unit_id, table_price_id, customer_name,
                      total_value, status, created_by, created_at
            "#,
        )
            .bind(tenant_id)
            .bind(unit_id)
            .bind(table_price_id)
            .bind(customer_name)
            .bind(total_value)
            .bind(created_by)
            .fetch_one(executor)
            .await?;

        Ok(proposal)
    }

    pub async fn add_condition<'e, E>(
        &self,
        executor: E,
        proposal_id: Uuid,
        position: i32,
        condition: &CorrectedCondition,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO proposal_conditions (
                proposal_id, position, kind, periodicity, periodicity_months,
                installment_count, installment_amount, total_amount, first_due_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
            .bind(proposal_id)
            .bind(position)
            .bind(condition.kind.label())
            .bind(&condition.periodicity)
            .bind(condition.periodicity_months)
            .bind(condition.installment_count)
            .bind(condition.installment_amount)
            .bind(condition.total_amount)
            .bind(condition.first_due_date)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Grava o livro de parcelas já ordenado e numerado (UNNEST em um só INSERT).
    pub async fn add_parcels(
        &self,
        conn: &mut PgConnection,
        proposal_id: Uuid,
        installments: &[ProposalInstallment],
    ) -> Result<Vec<ProposalParcel>, AppError> {
        let codes: Vec<String> = installments.iter().map(|p| p.code.to_string()).collect();
        let numbers: Vec<i32> = installments.iter().map(|p| p.sequence_number).collect();
        let due_dates: Vec<NaiveDate> = installments.iter().map(|p| p.due_date).collect();
        let amounts: Vec<Decimal> = installments.iter().map(|p| p.amount).collect();

        let mut parcels = sqlx::query_as::<_, ProposalParcel>(
            r#"
            INSERT INTO proposal_parcels (proposal_id, code, sequence_number, due_date, amount)
            SELECT $1, * FROM UNNEST($2::text[], $3::int4[], $4::date[], $5::numeric[])
            RETURNING id, proposal_id, code, sequence_number, due_date, amount
            "#,
        )
            .bind(proposal_id)
            .bind(&codes)
            .bind(&numbers)
            .bind(&due_dates)
            .bind(&amounts)
            .fetch_all(&mut *conn)
            .await?;

        // RETURNING não garante ordem.
        parcels.sort_by_key(|p| p.sequence_number);
        Ok(parcels)
    }

    pub async fn find_proposal<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        proposal_id: Uuid,
    ) -> Result<Option<Proposal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let proposal = sqlx::query_as::<_, Proposal>(
            r#"
            SELECT id, tenant_id, unit_id, table_price_id, customer_name,
                   total_value, status, created_by, created_at
            FROM proposals
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
            .bind(tenant_id)
            .bind(proposal_id)
            .fetch_optional(executor)
            .await?;

        Ok(proposal)
    }

    pub async fn list_conditions<'e, E>(
        &self,
        executor: E,
        proposal_id: Uuid,
    ) -> Result<Vec<CorrectedCondition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ConditionRow>(
            r#"
            SELECT kind, periodicity, periodicity_months, installment_count,
                   installment_amount, total_amount, first_due_date
            FROM proposal_conditions
            WHERE proposal_id = $1
            ORDER BY position ASC
            "#,
        )
            .bind(proposal_id)
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(CorrectedCondition::from).collect())
    }

    pub async fn list_parcels<'e, E>(
        &self,
        executor: E,
        proposal_id: Uuid,
    ) -> Result<Vec<ProposalParcel>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let parcels = sqlx::query_as::<_, ProposalParcel>(
            r#"
            SELECT id, proposal_id, code, sequence_number, due_date, amount
            FROM proposal_parcels
            WHERE proposal_id = $1
            ORDER BY sequence_number ASC
            "#,
        )
            .bind(proposal_id)
            .fetch_all(executor)
            .await?;

        Ok(parcels)
    }
}
