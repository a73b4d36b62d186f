// src/handlers/pricing.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        dates::{normalize_datetime_to_noon, normalize_to_noon},
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
        money::{lenient_decimal, lenient_optional_decimal},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::pricing::{
        FlowComparisonReport, FlowGeneration, FlowLeg, FlowTemplateLine, GeneratedInstallment,
        PriceOutcome, UnitStandardFlow,
    },
    services::{
        present_value::compare_flows,
        pricing_service::{derive_price, expand_flow, generate_flow},
    },
};

/// "Hoje" da comparação: a data enviada (só a parte de data) ou a data do servidor.
pub(crate) fn resolve_today(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => normalize_to_noon(text)
            .map(|noon| noon.date())
            .ok_or_else(|| AppError::InvalidInput(format!("Data de referência inválida: '{}'", text))),
        None => Ok(normalize_datetime_to_noon(&chrono::Local::now()).date()),
    }
}

// ---
// Payload: DerivePrice
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DerivePricePayload {
    #[serde(deserialize_with = "lenient_decimal")]
    #[schema(value_type = String, example = "72,5")]
    pub unit_area: Decimal,

    #[serde(deserialize_with = "lenient_decimal")]
    #[schema(value_type = String, example = "8500.00")]
    pub price_per_area: Decimal,

    #[serde(default, deserialize_with = "lenient_optional_decimal")]
    #[schema(value_type = Option<String>, example = "1.05")]
    pub correction_factor: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_optional_decimal")]
    #[schema(value_type = Option<String>, example = "1.02")]
    pub floor_factor: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_optional_decimal")]
    #[schema(value_type = Option<String>)]
    pub management_factor: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DerivedPrice {
    pub price: Decimal,
}

#[utoipa::path(
    post,
    path = "/api/pricing/price",
    tag = "Precificação",
    request_body = DerivePricePayload,
    responses(
        (status = 200, description = "Preço calculado", body = DerivedPrice),
        (status = 400, description = "Área não positiva ou valor do m² negativo")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora")
    ),
    security(("api_jwt" = []))
)]
pub async fn derive_unit_price(
    locale: Locale,
    Json(payload): Json<DerivePricePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let price = derive_price(
        payload.unit_area,
        payload.price_per_area,
        payload.correction_factor,
        payload.floor_factor,
        payload.management_factor,
    )
    .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(DerivedPrice { price }))
}

// ---
// Handler: preço de tabela de uma unidade
// ---
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitTablePrice {
    pub unit_id: Uuid,
    pub table_price_id: Uuid,
    pub area: Decimal,
    pub table_price: PriceOutcome,
}

#[utoipa::path(
    get,
    path = "/api/pricing/tables/{table_id}/units/{unit_id}/price",
    tag = "Precificação",
    responses(
        (status = 200, description = "Preço de tabela (ou {\"unpriced\": true})", body = UnitTablePrice),
        (status = 404, description = "Unidade não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora"),
        ("table_id" = Uuid, Path, description = "ID da tabela de preços"),
        ("unit_id" = Uuid, Path, description = "ID da unidade")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_unit_price(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((table_id, unit_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let (area, table_price) = app_state
        .pricing_service
        .unit_table_price(&mut rls_conn, tenant.0, table_id, unit_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(UnitTablePrice {
        unit_id,
        table_price_id: table_id,
        area,
        table_price,
    }))
}

// ---
// Payload: GenerateFlow (modelo enviado pelo cliente)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFlowPayload {
    #[serde(deserialize_with = "lenient_decimal")]
    #[schema(value_type = String, example = "100000.00")]
    pub target_total: Decimal,

    #[validate(length(min = 1, message = "Informe ao menos uma linha no modelo de fluxo."), nested)]
    pub lines: Vec<FlowTemplateLine>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFlow {
    pub flow: FlowGeneration,
    pub installments: Vec<GeneratedInstallment>,
}

#[utoipa::path(
    post,
    path = "/api/pricing/flows",
    tag = "Precificação",
    request_body = GenerateFlowPayload,
    responses(
        (status = 200, description = "Fluxo gerado e parcelas expandidas", body = GeneratedFlow),
        (status = 400, description = "Modelo inválido")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_payment_flow(
    locale: Locale,
    Json(payload): Json<GenerateFlowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let flow = generate_flow(payload.target_total, &payload.lines)
        .map_err(|e| e.to_api_error(&locale))?;
    let installments = expand_flow(&flow).map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(GeneratedFlow { flow, installments }))
}

// ---
// Handler: fluxo padrão da unidade
// ---
#[utoipa::path(
    get,
    path = "/api/pricing/tables/{table_id}/units/{unit_id}/flow",
    tag = "Precificação",
    responses(
        (status = 200, description = "Preço de tabela e fluxo padrão", body = UnitStandardFlow),
        (status = 404, description = "Unidade não encontrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora"),
        ("table_id" = Uuid, Path, description = "ID da tabela de preços"),
        ("unit_id" = Uuid, Path, description = "ID da unidade")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_unit_standard_flow(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((table_id, unit_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let standard = app_state
        .pricing_service
        .standard_flow(&mut rls_conn, tenant.0, table_id, unit_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(standard))
}

// ---
// Payload: CompareFlows (dois conjuntos de pernas)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompareFlowsPayload {
    #[validate(nested)]
    pub standard: Vec<FlowLeg>,
    #[validate(nested)]
    pub proposed: Vec<FlowLeg>,

    #[serde(default, deserialize_with = "lenient_optional_decimal")]
    #[schema(value_type = Option<String>, example = "72.5")]
    pub unit_area: Option<Decimal>,

    /// Data de referência; sem ela vale a data do servidor.
    #[schema(example = "2025-01-10")]
    pub today: Option<String>,

    /// Sobrescreve a taxa mensal configurada.
    #[serde(default, deserialize_with = "lenient_optional_decimal")]
    #[schema(value_type = Option<String>, example = "0.005")]
    pub monthly_rate: Option<Decimal>,
}

#[utoipa::path(
    post,
    path = "/api/pricing/flows/compare",
    tag = "Precificação",
    request_body = CompareFlowsPayload,
    responses(
        (status = 200, description = "Comparação nominal e a valor presente", body = FlowComparisonReport),
        (status = 400, description = "Dados inválidos")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora")
    ),
    security(("api_jwt" = []))
)]
pub async fn compare_payment_flows(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CompareFlowsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let today = resolve_today(payload.today.as_deref()).map_err(|e| e.to_api_error(&locale))?;

    let monthly_rate = payload
        .monthly_rate
        .unwrap_or(app_state.pricing.monthly_discount_rate);

    let report = compare_flows(
        &payload.standard,
        &payload.proposed,
        today,
        monthly_rate,
        payload.unit_area.unwrap_or(Decimal::ONE),
    )
    .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(report))
}
