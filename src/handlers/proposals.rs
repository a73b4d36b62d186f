// src/handlers/proposals.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
        money::{lenient_decimal, lenient_optional_decimal},
    },
    config::AppState,
    handlers::pricing::resolve_today,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::{
        pricing::FlowComparisonReport,
        proposal::{ParcelLedger, ProposalCondition, ProposalDetail},
    },
    services::proposal_service::{build_parcels, NewProposal},
};

// ---
// Payload: PreviewParcels (só o montador, nada é gravado)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewParcelsPayload {
    #[serde(deserialize_with = "lenient_decimal")]
    #[schema(value_type = String, example = "100000,00")]
    pub target_total: Decimal,

    #[validate(length(min = 1, message = "Informe ao menos uma condição de pagamento."), nested)]
    pub conditions: Vec<ProposalCondition>,
}

#[utoipa::path(
    post,
    path = "/api/proposals/preview",
    tag = "Propostas",
    request_body = PreviewParcelsPayload,
    responses(
        (status = 200, description = "Parcelas ordenadas e condições corrigidas", body = ParcelLedger),
        (status = 400, description = "Condições inválidas")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora")
    ),
    security(("api_jwt" = []))
)]
pub async fn preview_parcels(
    locale: Locale,
    Json(payload): Json<PreviewParcelsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let ledger = build_parcels(payload.target_total, &payload.conditions)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(ledger))
}

// ---
// Payload: CreateProposal
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalPayload {
    pub unit_id: Uuid,

    pub table_price_id: Option<Uuid>,

    #[validate(length(min = 1, message = "O nome do cliente é obrigatório."))]
    #[schema(example = "Maria da Silva")]
    pub customer_name: String,

    #[serde(deserialize_with = "lenient_decimal")]
    #[schema(value_type = String, example = "100000,00")]
    pub total_value: Decimal,

    #[validate(length(min = 1, message = "Informe ao menos uma condição de pagamento."), nested)]
    pub conditions: Vec<ProposalCondition>,
}

#[utoipa::path(
    post,
    path = "/api/proposals",
    tag = "Propostas",
    request_body = CreateProposalPayload,
    responses(
        (status = 201, description = "Proposta criada e unidade reservada", body = ProposalDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Unidade não encontrada"),
        (status = 409, description = "Unidade não está disponível")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_proposal(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateProposalPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let detail = app_state
        .proposal_service
        .create_proposal(
            &mut *rls_conn,
            tenant.0,
            user.0.id,
            NewProposal {
                unit_id: payload.unit_id,
                table_price_id: payload.table_price_id,
                customer_name: payload.customer_name.trim(),
                total_value: payload.total_value,
                conditions: &payload.conditions,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/proposals/{id}",
    tag = "Propostas",
    responses(
        (status = 200, description = "Proposta com condições e parcelas", body = ProposalDetail),
        (status = 404, description = "Proposta não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora"),
        ("id" = Uuid, Path, description = "ID da proposta")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_proposal(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(proposal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let detail = app_state
        .proposal_service
        .get_proposal(&mut rls_conn, tenant.0, proposal_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(detail))
}

// ---
// Payload: CompareWithStandard
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompareProposalPayload {
    pub unit_id: Uuid,
    pub table_price_id: Uuid,

    #[serde(deserialize_with = "lenient_decimal")]
    #[schema(value_type = String, example = "100000,00")]
    pub total_value: Decimal,

    #[validate(length(min = 1, message = "Informe ao menos uma condição de pagamento."), nested)]
    pub conditions: Vec<ProposalCondition>,

    #[schema(example = "2025-01-10")]
    pub today: Option<String>,

    #[serde(default, deserialize_with = "lenient_optional_decimal")]
    #[schema(value_type = Option<String>, example = "0.005")]
    pub monthly_rate: Option<Decimal>,
}

#[utoipa::path(
    post,
    path = "/api/proposals/compare",
    tag = "Propostas",
    request_body = CompareProposalPayload,
    responses(
        (status = 200, description = "Proposta contra o fluxo padrão da tabela", body = FlowComparisonReport),
        (status = 400, description = "Dados inválidos ou unidade sem preço na tabela"),
        (status = 404, description = "Unidade não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora")
    ),
    security(("api_jwt" = []))
)]
pub async fn compare_with_standard(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CompareProposalPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let today = resolve_today(payload.today.as_deref()).map_err(|e| e.to_api_error(&locale))?;
    let monthly_rate = payload
        .monthly_rate
        .unwrap_or(app_state.pricing.monthly_discount_rate);

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let report = app_state
        .proposal_service
        .compare_with_standard(
            &mut rls_conn,
            tenant.0,
            payload.table_price_id,
            payload.unit_id,
            payload.total_value,
            &payload.conditions,
            today,
            monthly_rate,
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_condition_list_fails_validation() {
        let payload: PreviewParcelsPayload =
            serde_json::from_str(r#"{"targetTotal": "1000", "conditions": []}"#).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn nested_conditions_are_validated() {
        let payload: PreviewParcelsPayload = serde_json::from_str(
            r#"{
                "targetTotal": "1.000,00",
                "conditions": [
                    {"kind": "ENTRY", "periodicity": "UNICA", "installmentCount": 0,
                     "installmentAmount": "1000", "firstDueDate": "2025-01-10"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.target_total, "1000".parse::<Decimal>().unwrap());
        assert!(payload.validate().is_err());
    }

    #[test]
    fn installment_count_is_capped_by_validation() {
        let payload: PreviewParcelsPayload = serde_json::from_str(
            r#"{
                "targetTotal": "601",
                "conditions": [
                    {"kind": "MONTHLY", "periodicity": "MENSAL", "installmentCount": 601,
                     "installmentAmount": "1", "firstDueDate": "2025-01-10"}
                ]
            }"#,
        )
        .unwrap();
        assert!(payload.validate().is_err());
    }
}
