// src/models/proposal.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{common::money::lenient_decimal, models::pricing::ConditionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "proposal_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Cancelled,
}

// ---
// 1. Condição enviada pelo corretor (entrada do montador de parcelas)
// ---
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposalCondition {
    #[schema(value_type = String, example = "MONTHLY")]
    pub kind: ConditionType,

    #[schema(example = "MENSAL")]
    #[serde(default)]
    pub periodicity: String,

    #[validate(range(min = 1, max = 600, message = "A quantidade de parcelas deve estar entre 1 e 600."))]
    #[schema(example = 36)]
    pub installment_count: i32,

    #[serde(deserialize_with = "lenient_decimal")]
    #[schema(value_type = String, example = "2500,00")]
    pub installment_amount: Decimal,

    // Texto "YYYY-MM-DD"; hora e fuso, se vierem, são descartados.
    #[validate(length(min = 10, message = "Data do primeiro vencimento inválida."))]
    #[schema(example = "2025-02-10")]
    pub first_due_date: String,
}

// ---
// 2. Saída do montador
// ---

/// Resumo da condição coerente com as parcelas que serão gravadas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorrectedCondition {
    #[schema(value_type = String)]
    pub kind: ConditionType,
    pub periodicity: String,
    pub periodicity_months: i32,
    pub installment_count: i32,
    pub installment_amount: Decimal,
    pub total_amount: Decimal,
    #[schema(value_type = String, format = Date)]
    pub first_due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposalInstallment {
    /// Código curto do tipo (E, M, I, A, C, F, O).
    #[schema(value_type = String, example = "E")]
    pub code: char,
    pub sequence_number: i32,
    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,
    pub amount: Decimal,
    /// Índice da condição de origem na lista enviada.
    pub condition_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParcelLedger {
    pub target_total: Decimal,
    pub corrected_conditions: Vec<CorrectedCondition>,
    pub installments: Vec<ProposalInstallment>,
    /// Diferença aplicada na parcela de entrada (zero se já fechava).
    pub drift_applied: Decimal,
}

// ---
// 3. Registros persistidos
// ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub table_price_id: Option<Uuid>,
    #[schema(example = "Maria da Silva")]
    pub customer_name: String,
    #[schema(example = "612500.00")]
    pub total_value: Decimal,
    pub status: ProposalStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposalParcel {
    pub id: Uuid,
    pub proposal_id: Uuid,
    #[schema(example = "E")]
    pub code: String,
    pub sequence_number: i32,
    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDetail {
    #[serde(flatten)]
    pub header: Proposal,
    pub conditions: Vec<CorrectedCondition>,
    pub parcels: Vec<ProposalParcel>,
}
