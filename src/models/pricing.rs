// src/models/pricing.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Enums ---

/// Tipo de uma linha de fluxo / condição de pagamento.
///
/// Tipos desconhecidos não são rejeitados: viram `Other` e recebem o código "O".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionType {
    Entry,        // Entrada / Sinal
    Monthly,      // Mensais
    Intermediate, // Intermediárias
    Annual,       // Anuais
    Keys,         // Chaves
    Financing,    // Financiamento bancário
    Other(String),
}

impl ConditionType {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "ENTRY" | "ENTRADA" | "SINAL" => Self::Entry,
            "MONTHLY" | "MENSAL" | "MENSAIS" => Self::Monthly,
            "INTERMEDIATE" | "INTERMEDIARIA" | "INTERMEDIÁRIA" => Self::Intermediate,
            "ANNUAL" | "ANUAL" => Self::Annual,
            "KEYS" | "CHAVES" => Self::Keys,
            "FINANCING" | "FINANCIAMENTO" => Self::Financing,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    /// Código curto usado no livro de parcelas e no desempate da ordenação.
    pub fn code(&self) -> char {
        match self {
            Self::Entry => 'E',
            Self::Monthly => 'M',
            Self::Intermediate => 'I',
            Self::Annual => 'A',
            Self::Keys => 'C',
            Self::Financing => 'F',
            Self::Other(_) => 'O',
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Entry => "ENTRY".to_string(),
            Self::Monthly => "MONTHLY".to_string(),
            Self::Intermediate => "INTERMEDIATE".to_string(),
            Self::Annual => "ANNUAL".to_string(),
            Self::Keys => "KEYS".to_string(),
            Self::Financing => "FINANCING".to_string(),
            Self::Other(label) => label.clone(),
        }
    }
}

impl From<String> for ConditionType {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<ConditionType> for String {
    fn from(value: ConditionType) -> Self {
        value.label()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "unit_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Available,
    Reserved,
    Sold,
    Blocked,
}

// --- Structs de Banco ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Torre A - Apto 1203")]
    pub name: String,
    #[schema(example = "72.50")]
    pub area: Decimal,
    pub status: UnitStatus,
    pub created_at: Option<DateTime<Utc>>,
}

/// Linha de fatores de uma unidade numa tabela de preço.
/// Fatores nulos são neutros (valem 1).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceFactor {
    pub unit_id: Uuid,
    pub table_price_id: Uuid,
    #[schema(example = "8500.00")]
    pub price_per_area: Decimal,
    #[schema(example = "1.02")]
    pub floor_factor: Option<Decimal>,
    pub management_factor: Option<Decimal>,
    pub correction_factor: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowTemplateLine {
    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "ENTRY")]
    pub kind: ConditionType,
    #[schema(example = "20.00")]
    pub percentage_of_total: Decimal,
    #[validate(range(min = 1, max = 600, message = "A quantidade de parcelas deve estar entre 1 e 600."))]
    #[schema(example = 1)]
    pub installment_count: i32,
    #[validate(range(min = 0, max = 1200, message = "Periodicidade em meses fora do intervalo aceito."))]
    #[schema(example = 0)]
    pub periodicity_months: i32,
    #[schema(value_type = String, format = Date, example = "2025-01-10")]
    pub first_due_date: NaiveDate,
}

// --- Resultados (derivados, nunca persistidos) ---

/// Preço de tabela de uma unidade. Sem linha ativa de fatores, a unidade
/// fica "sem preço", o que é diferente de custar zero.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum PriceOutcome {
    Priced { price: Decimal },
    Unpriced { unpriced: bool },
}

impl PriceOutcome {
    pub fn unpriced() -> Self {
        Self::Unpriced { unpriced: true }
    }

    pub fn price(&self) -> Option<Decimal> {
        match self {
            Self::Priced { price } => Some(*price),
            Self::Unpriced { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFlowLine {
    #[schema(value_type = String, example = "MONTHLY")]
    pub kind: ConditionType,
    #[schema(example = "MENSAL")]
    pub periodicity_label: String,
    pub periodicity_months: i32,
    pub installment_count: i32,
    #[schema(example = "8000.00")]
    pub installment_amount: Decimal,
    /// Total da linha já corrigido (parcela × quantidade + centavos absorvidos).
    #[schema(example = "80000.00")]
    pub line_total: Decimal,
    pub percentage_of_total: Decimal,
    #[schema(value_type = String, format = Date)]
    pub first_due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowGeneration {
    pub target_total: Decimal,
    pub lines: Vec<GeneratedFlowLine>,
    /// Centavos que nenhuma linha de parcela única pôde absorver.
    /// `None` quando o fluxo fecha exatamente no valor alvo.
    pub unabsorbed_drift: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedInstallment {
    #[schema(value_type = String, example = "E")]
    pub kind: ConditionType,
    pub sequence_number: i32,
    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// Fluxo padrão de uma unidade numa tabela: preço de tabela + parcelas do modelo.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitStandardFlow {
    pub unit_id: Uuid,
    pub table_price_id: Uuid,
    pub area: Decimal,
    pub table_price: PriceOutcome,
    /// Ausente quando a unidade não tem preço nessa tabela.
    pub flow: Option<FlowGeneration>,
}

/// Uma "perna" de fluxo para o cálculo de valor presente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowLeg {
    #[validate(range(min = 0, max = 600, message = "A quantidade de parcelas deve estar entre 0 e 600."))]
    pub installment_count: i32,
    pub installment_amount: Decimal,
    #[schema(value_type = String, format = Date)]
    pub start_date: NaiveDate,
    #[validate(range(min = 0, max = 1200, message = "Periodicidade em meses fora do intervalo aceito."))]
    pub periodicity_months: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowTotals {
    pub total_nominal: Decimal,
    pub total_present_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowComparisonResult {
    pub standard: FlowTotals,
    pub proposed: FlowTotals,
    pub delta_nominal: Decimal,
    pub delta_present: Decimal,
    pub variance_percent_nominal: Decimal,
    pub variance_percent_present: Decimal,
}

/// Comparação completa: valores absolutos e por m² da unidade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowComparisonReport {
    pub monthly_rate: Decimal,
    pub total: FlowComparisonResult,
    pub per_area: FlowComparisonResult,
}
